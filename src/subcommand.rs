use super::*;

mod fetch;
mod watch;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
    #[command(about = "Probe the first pool and print one work item")]
    Fetch(fetch::Fetch),
    #[command(about = "Long-poll the current pool and log block changes")]
    Watch(watch::Watch),
}

impl Subcommand {
    pub(crate) fn run(self, settings: Settings, cancel: CancellationToken) -> Result {
        match self {
            Self::Fetch(fetch) => fetch.run(settings),
            Self::Watch(watch) => watch.run(settings, cancel),
        }
    }
}
