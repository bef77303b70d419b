use clap::Args;

#[derive(Args)]
pub struct SharedSettings {
    /// Overwrite an existing output directory
    #[arg(long, global = true)]
    pub clobber: bool,

    /// Turn on extra debug logging
    ///
    /// This option enables per-cluster classification logging intended for debugging only.
    ///
    #[arg(long, global = true)]
    pub debug: bool,
}
