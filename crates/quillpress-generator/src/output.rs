//! Flushing rendered outputs and static assets to disk.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use quillpress_parser::minify_html;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::context::{BuildContext, CopyDir};

/// Counts from one write pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Rendered outputs written.
    pub files: usize,
    /// Static files copied.
    pub assets: usize,
    /// Writes or copies that failed.
    pub failed: usize,
}

impl WriteStats {
    pub fn merge(&mut self, other: WriteStats) {
        self.files += other.files;
        self.assets += other.assets;
        self.failed += other.failed;
    }
}

/// Writes a build context's outputs under an output directory.
#[derive(Debug)]
pub struct OutputWriter {
    output_dir: PathBuf,
    minify: bool,
}

impl OutputWriter {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, minify: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            minify,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Destination of an output path such as `/tag/go/index.html`.
    ///
    /// `None` when the path would leave the output directory.
    pub fn target(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.output_dir.join(relative))
    }

    /// Write every output in path order.
    ///
    /// Failures are logged and counted; the remaining outputs are still written.
    pub fn write(&self, ctx: &BuildContext) -> WriteStats {
        let mut stats = WriteStats::default();

        for (path, data) in ctx.outputs() {
            let Some(target) = self.target(&path) else {
                stats.failed += 1;
                warn!(path = %path, "output path escapes the output directory, skipping");
                continue;
            };
            let bytes = if self.minify && path.ends_with(".html") {
                let minified = minify_html(&data);
                if minified.is_empty() && !data.is_empty() {
                    warn!(path = %path, "minified output is empty, writing original");
                    data.to_vec()
                } else {
                    minified
                }
            } else {
                data.to_vec()
            };

            match write_file(&target, &bytes) {
                Ok(()) => {
                    ctx.increment_counter();
                    if let Ok(written) = target.strip_prefix(&self.output_dir) {
                        ctx.record_file(written);
                    }
                    stats.files += 1;
                    debug!(path = %target.display(), size = bytes.len(), "output written");
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(path = %target.display(), error = %e, "failed to write output");
                }
            }
        }

        info!(
            files = stats.files,
            failed = stats.failed,
            dir = %self.output_dir.display(),
            "outputs written"
        );
        stats
    }

    /// Copy every registered static directory into the output tree.
    pub fn copy_assets(&self, ctx: &BuildContext) -> WriteStats {
        let mut stats = WriteStats::default();
        for dir in ctx.copy_dirs() {
            stats.merge(self.copy_dir(ctx, dir));
        }

        info!(assets = stats.assets, failed = stats.failed, "assets copied");
        stats
    }

    fn copy_dir(&self, ctx: &BuildContext, dir: &CopyDir) -> WriteStats {
        let mut stats = WriteStats::default();

        if !dir.src.is_dir() {
            debug!(src = %dir.src.display(), "asset directory does not exist, skipping");
            return stats;
        }

        let dest_root = self.output_dir.join(&dir.dest);
        for entry in WalkDir::new(&dir.src).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(src = %dir.src.display(), error = %e, "failed to read asset entry");
                    stats.failed += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || is_temp_file(entry.path()) {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&dir.src) else {
                continue;
            };
            let target = dest_root.join(relative);
            let copied = target
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| fs::copy(entry.path(), &target));

            match copied {
                Ok(_) => {
                    if let Ok(written) = target.strip_prefix(&self.output_dir) {
                        ctx.record_file(written);
                    }
                    stats.assets += 1;
                    debug!(src = %entry.path().display(), dest = %target.display(), "asset copied");
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(src = %entry.path().display(), error = %e, "failed to copy asset");
                }
            }
        }

        stats
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

/// Whether a file name looks like an editor or OS scratch file.
pub fn is_temp_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    name.ends_with('~')
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
        || name == ".DS_Store"
        || name == "4913"
        || name.starts_with(".goutputstream")
        || (name.starts_with("jb_") && name.ends_with("___"))
        || name.starts_with(".sb-")
        || name.starts_with(".#")
        || name.starts_with('#')
}

#[cfg(test)]
mod tests {
    use quillpress_core::Config;

    use super::*;
    use crate::{build::BuildOptions, site::SiteData, theme::ThemeEngine};

    fn context(root: &Path) -> BuildContext {
        let theme_dir = root.join("theme");
        fs::create_dir_all(&theme_dir).expect("create theme dir");
        fs::write(theme_dir.join("index.html"), "x").expect("write");
        let theme = ThemeEngine::load(&theme_dir, "theme_config.toml").expect("load theme");

        let mut site =
            SiteData::from_parts(Config::default(), root.to_path_buf(), Vec::new(), Vec::new(), theme);
        BuildContext::new(&mut site, &BuildOptions::default()).expect("context")
    }

    #[test]
    fn test_is_temp_file() {
        for name in [
            "a.md~",
            "a.swp",
            "a.swx",
            "a.tmp",
            ".DS_Store",
            "4913",
            ".goutputstream-ABC",
            "jb_old___",
            ".sb-1234",
            ".#lock",
            "#autosave#",
        ] {
            assert!(is_temp_file(Path::new(name)), "{name} should be temporary");
        }
        for name in ["style.css", "post.md", "jb_notes.txt", "4914"] {
            assert!(!is_temp_file(Path::new(name)), "{name} should not be temporary");
        }
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = context(dir.path());
        ctx.set_output("/index.html", b"<html>  <body> <p>hi</p> </body></html>".to_vec());
        ctx.set_output("/atom.xml", b"<feed>  </feed>".to_vec());

        let out = dir.path().join("out");
        let stats = OutputWriter::new(&out, true).write(&ctx);

        assert_eq!(stats.files, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(ctx.counter(), 2);

        let html = fs::read_to_string(out.join("index.html")).expect("read html");
        assert!(html.contains("<p>hi</p>"));
        assert!(!html.contains("  "));
        let xml = fs::read_to_string(out.join("atom.xml")).expect("read xml");
        assert_eq!(xml, "<feed>  </feed>");
    }

    #[test]
    fn test_write_without_minify() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = context(dir.path());
        let raw = "<p>  spaced  </p>";
        ctx.set_output("/a/b/index.html", raw.as_bytes().to_vec());

        let out = dir.path().join("out");
        OutputWriter::new(&out, false).write(&ctx);
        assert_eq!(fs::read_to_string(out.join("a/b/index.html")).expect("read"), raw);
    }

    #[test]
    fn test_write_failure_continues() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = context(dir.path());
        let out = dir.path().join("out");
        fs::create_dir_all(&out).expect("create out");
        // A file where a directory is needed.
        fs::write(out.join("blocked"), "file").expect("write");

        ctx.set_output("/blocked/index.html", b"x".to_vec());
        ctx.set_output("/ok.html", b"y".to_vec());

        let stats = OutputWriter::new(&out, false).write(&ctx);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.failed, 1);
        assert!(out.join("ok.html").exists());
    }

    #[test]
    fn test_write_rejects_parent_components() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ctx = context(dir.path());
        ctx.set_output("/../../escaped/index.html", b"x".to_vec());
        ctx.set_output("/posts/../../up.html", b"x".to_vec());
        ctx.set_output("/./kept/index.html", b"y".to_vec());

        let out = dir.path().join("out");
        let writer = OutputWriter::new(&out, false);
        assert!(writer.target("/a/../../b.html").is_none());
        assert_eq!(writer.target("/a/b.html"), Some(out.join("a/b.html")));

        let stats = writer.write(&ctx);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.failed, 2);
        assert!(!dir.path().join("escaped").exists());
        assert!(!dir.path().join("up.html").exists());
        assert!(out.join("kept/index.html").exists());
        assert_eq!(ctx.written_files(), vec![PathBuf::from("kept/index.html")]);
    }

    #[test]
    fn test_copy_assets_skips_temp_files() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut ctx = context(dir.path());

        let assets = dir.path().join("assets");
        fs::create_dir_all(assets.join("css")).expect("create assets");
        fs::write(assets.join("css/site.css"), "body{}").expect("write");
        fs::write(assets.join("css/site.css~"), "old").expect("write");
        fs::write(assets.join(".DS_Store"), "").expect("write");

        let public = dir.path().join("content/public");
        fs::create_dir_all(&public).expect("create public");
        fs::write(public.join("robots.txt"), "User-agent: *").expect("write");

        let theme_static = dir.path().join("theme/static");
        fs::create_dir_all(&theme_static).expect("create theme static");
        fs::write(theme_static.join("main.js"), "1").expect("write");
        ctx.add_copy_dir(CopyDir::new(&theme_static, "."));

        let out = dir.path().join("out");
        let stats = OutputWriter::new(&out, true).copy_assets(&ctx);

        assert_eq!(stats.assets, 3);
        assert_eq!(stats.failed, 0);
        assert!(out.join("css/site.css").exists());
        assert!(!out.join("css/site.css~").exists());
        assert!(!out.join(".DS_Store").exists());
        assert!(out.join("robots.txt").exists());
        assert!(out.join("main.js").exists());

        let mut written = ctx.written_files();
        written.sort();
        assert_eq!(
            written,
            vec![
                PathBuf::from("css/site.css"),
                PathBuf::from("main.js"),
                PathBuf::from("robots.txt"),
            ]
        );
    }
}
