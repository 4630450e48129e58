use {
    super::*,
    clap::builder::styling::{AnsiColor, Effects, Styles},
    subcommand::Subcommand,
};

#[derive(Debug, Parser)]
#[command(
  version,
  styles = Styles::styled()
    .error(AnsiColor::Red.on_default() | Effects::BOLD)
    .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
    .invalid(AnsiColor::Red.on_default())
    .literal(AnsiColor::Blue.on_default())
    .placeholder(AnsiColor::Cyan.on_default())
    .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
    .valid(AnsiColor::Green.on_default()),
)]
pub(crate) struct Arguments {
    #[command(flatten)]
    pub(crate) options: Options,
    #[command(subcommand)]
    pub(crate) subcommand: Subcommand,
}

impl Arguments {
    pub(crate) fn run(self, cancel: CancellationToken) -> Result {
        let settings = Settings::load(self.options)?;
        self.subcommand.run(settings, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_options_before_subcommand() {
        let arguments = Arguments::try_parse_from([
            "poolwork",
            "--pool",
            "http://a.example",
            "--lowmem",
            "watch",
            "--interval",
            "5",
        ])
        .unwrap();

        assert_eq!(arguments.options.pools.len(), 1);
        assert!(arguments.options.lowmem);
        assert!(matches!(arguments.subcommand, Subcommand::Watch(_)));
    }

    #[test]
    fn subcommand_required() {
        assert!(Arguments::try_parse_from(["poolwork", "--pool", "http://a.example"]).is_err());
    }
}
