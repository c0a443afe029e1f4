use clap::Parser;
use site_gen::output::{self, Diagnostics};
use site_gen::{config, generate};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "site-gen")]
#[command(about = "Static site generator for a Markdown blog")]
#[command(long_about = "\
Static site generator for a Markdown blog

Run from the project root. Posts, the about page and global variables are
read from the content root; templates and assets from the generator root.

Project structure:

  site-gen.toml                      # Build config (optional)
  site-src/
  ├── global.yml                     # Global variables (optional)
  ├── posts/
  │   └── hello/
  │       ├── hello.md               # Post body (exactly one .md)
  │       └── hello.yml              # Post variables (optional)
  └── about/
      ├── about.md
      └── about.yml
  generator/
  ├── assets/                        # Copied to <build>/assets
  └── templates/
      ├── common/header.html.mustache   # → {{{common.header}}} or {{> header}}
      ├── posts/index.html.mustache     # → posts/<slug>/index.html
      ├── about/index.html.mustache     # → about/index.html
      └── home/index.html.mustache      # → index.html (optional)

Variables resolve in this order, later wins:
  built-ins (url-home, url-about) → global.yml → common.* →
  post.slug / post.url → <slug>.yml → post.content

The build directory (tmp-site-build by default) must not exist.")]
#[command(version)]
struct Cli {
    /// Print resolved variables while building
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let diagnostics = Diagnostics::new(cli.debug);

    let root = std::env::current_dir()?;
    let site_config = config::load_config(&root)?;
    let build_dir = root.join(&site_config.build_dir);

    println!(
        "==> Building {} \u{2192} {}",
        site_config.content_root, site_config.build_dir
    );
    let report = generate::build_site(&root, &site_config, &diagnostics)?;
    output::print_build_output(&report, &build_dir);

    println!("==> Build complete: {}", build_dir.display());
    Ok(())
}
