use anyhow::Context;
use spacetrack::SessionClient;

#[derive(Clone, Debug, clap::Parser)]
pub struct QueryCommand {
    /// Path relative to the base URL, already percent-encoded.
    path: String,
}

impl QueryCommand {
    pub fn exec(self, client: &mut SessionClient) -> anyhow::Result<()> {
        let Self { path } = self;
        let body = client
            .send_request(&path)
            .with_context(|| format!("Could not fetch {path}"))?;
        print!("{body}");
        Ok(())
    }
}
