//! `prax-squash version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("Prax Squash");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    let mut drivers = Vec::new();

    #[cfg(feature = "postgres")]
    drivers.push("postgres");

    #[cfg(feature = "mysql")]
    drivers.push("mysql");

    #[cfg(feature = "sqlite")]
    drivers.push("sqlite");

    #[cfg(feature = "mssql")]
    drivers.push("mssql");

    if drivers.is_empty() {
        drivers.push("none");
    }

    kv("Drivers", &drivers.join(", "));

    output::newline();
    output::dim("https://github.com/pegasusheavy/prax-orm");

    Ok(())
}
