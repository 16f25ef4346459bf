use anyhow::Context;
use spacetrack::{SessionClient, DEFAULT_NORAD_ID};

#[derive(Clone, Debug, clap::Parser)]
pub struct TleCommand {
    /// NORAD catalog number of the object.
    #[arg(default_value_t = DEFAULT_NORAD_ID)]
    norad_id: u32,
}

impl TleCommand {
    pub fn exec(self, client: &mut SessionClient) -> anyhow::Result<()> {
        let Self { norad_id } = self;
        let tle = client
            .get_latest_tle(Some(norad_id))
            .with_context(|| format!("Could not fetch TLE for {norad_id}"))?;
        print!("{tle}");
        Ok(())
    }
}
