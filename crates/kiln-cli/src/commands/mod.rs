//! Command implementations for the kiln CLI.
//!
//! - [`build`] - One-shot production build
//! - [`dev`] - Development build, then watch mode with live reload
//! - [`test`] - Placeholder for the test stage
//!
//! Each command is implemented in its own module and provides a `run`
//! function that returns a Result.

pub mod build;
pub mod dev;
pub mod test;

use owo_colors::OwoColorize;

/// Print the task listing for a bare invocation.
pub fn about() {
    println!("{}", "kiln".bold());
    println!("Front-end build pipeline: compiles assets, renders templates, compresses images.");
    println!();
    println!("{}", "Commands:".bold());
    println!(
        "  {}   Production build into the public directory",
        "build".green()
    );
    println!(
        "  {}     Development build, then watch with live reload",
        "dev".green()
    );
    println!("  {}    Test stage placeholder, exits successfully", "test".green());
    println!();
    println!("Run 'kiln <command> --help' for details.");
}
