//! Build command - generates the static site

use color_eyre::eyre::{Result, WrapErr};
use quillpress_generator::{BuildOptions, BuildStats, generate};

/// Run the build command.
pub fn run(options: &BuildOptions) -> Result<BuildStats> {
    tracing::info!(
        config = %options.config_file.path.display(),
        output = ?options.output_dir,
        drafts = options.enable_drafts,
        "Starting build"
    );

    let stats = generate(options).wrap_err("Build failed")?;
    print_build_stats(&stats);

    if stats.failed > 0 {
        tracing::warn!(failed = stats.failed, "some files could not be written");
    }

    Ok(stats)
}

/// Print build statistics in a user-friendly format.
pub fn print_build_stats(stats: &BuildStats) {
    println!();
    println!("  Build completed!");
    println!();
    println!("  Posts:      {:>6}", stats.posts);
    println!("  Pages:      {:>6}", stats.pages);
    println!("  Tags:       {:>6}", stats.tags);
    println!("  Outputs:    {:>6}", stats.outputs);
    println!("  Assets:     {:>6}", stats.assets);
    if stats.failed > 0 {
        println!("  Failed:     {:>6}", stats.failed);
    }
    println!();
    println!("  Duration:   {:>6}ms", stats.duration_ms);
    println!("  Output:     {}", stats.output_dir.display());
    if let Some(archive) = &stats.archive {
        println!("  Archive:    {}", archive.display());
    }
    println!();
}
