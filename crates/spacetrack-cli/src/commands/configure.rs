use log::info;
use spacetrack::ClientConfig;

#[derive(Clone, Debug, clap::Parser)]
pub struct ConfigureCommand;

impl ConfigureCommand {
    pub fn exec(self, mut config: ClientConfig) -> anyhow::Result<()> {
        config.password.clear();
        let path = config.to_fs()?;
        info!("Saved configuration for {:?}", config.username);
        println!("{}", path.display());
        Ok(())
    }
}
