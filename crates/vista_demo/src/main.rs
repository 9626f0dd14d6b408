use clap::Parser;
use vista_utils::{ok, AnyResult};

fn main() -> AnyResult {
    let cli = vista_demo::Cli::parse_from(wild::args());

    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(cli.log_level())
        .init();

    vista_demo::run(cli)?;
    ok()
}
