//! Miette diagnostic conversion for CLI errors.

use miette::Report;

use crate::error::CliError;

/// Convert a [`CliError`] into a miette [`Report`] for terminal rendering.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Pipeline { step, source } => {
            miette::miette!("Build step '{}' failed\n\n{}", step, source)
        }
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::Bundler(e) => miette::miette!("Bundler error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_report_carries_step_and_cause() {
        let err = CliError::Pipeline {
            step: "publish",
            source: Box::new(CliError::Custom("disk full".to_string())),
        };
        let rendered = format!("{:?}", cli_error_to_miette(err));
        assert!(rendered.contains("publish"));
        assert!(rendered.contains("disk full"));
    }

    #[test]
    fn plain_errors_render_their_message() {
        let err = CliError::Server("port in use".to_string());
        let rendered = format!("{:?}", cli_error_to_miette(err));
        assert!(rendered.contains("port in use"));
    }
}
