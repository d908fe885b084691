use colored::Colorize;

pub mod analysis;
pub mod data;
pub mod error;
pub mod payloads;
pub mod report;
pub mod scan;

pub use error::CoreError;

pub fn print_banner() {
    let banner = r#"
  ┌─┐┌─┐┬─┐┌┬┐┌─┐┬─┐┌─┐┌┐ ┌─┐
  ├┤ │ │├┬┘│││├─┘├┬┘│ │├┴┐├┤
  └  └─┘┴└─┴ ┴┴  ┴└─└─┘└─┘└─┘"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n  {}\n",
        "formprobe".bold(),
        env!("CARGO_PKG_VERSION").dimmed(),
        "For authorized security testing only.".yellow()
    );
}
