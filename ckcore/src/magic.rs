/// Name of the runtime hook called at every function entry and exit.
pub const CHECKPOINT_HOOK_NAME: &str = "checkpoint";

/// Name of the runtime hook called once before the program entry starts.
pub const INITIALIZE_HOOK_NAME: &str = "initialize";

/// Name of the runtime hook called before the program entry returns.
pub const FINALIZE_HOOK_NAME: &str = "finalize";

/// Conventional name of the program entry point.
pub const ENTRY_FUNCTION_NAME: &str = "main";

/// Tag passed as first checkpoint argument when entering a function.
pub const ENTER_TAG: &str = "Entering ";

/// Tag passed as first checkpoint argument when leaving a function.
pub const EXIT_TAG: &str = "Exiting ";

/// Number of call sites generated by the makecalls pass.
pub const DEFAULT_SAMPLE_COUNT: u32 = 30;

/// Widest integer parameter the makecalls pass accepts.
pub const MAX_SAMPLED_WIDTH: u32 = 64;

/// Name of the environment variable containing the path to the pass configuration file.
/// If not set, defaults to
///  (1) on Linux and macOS: `$XDG_CONFIG_HOME/ckprof/passes.toml` or `$HOME/.config/ckprof/passes.toml`
///  (2) on Windows: `%APPDATA%\ckprof\passes.toml`
pub const ENV_PASS_CONFIG_PATH: &str = "CKPROF_CONFIG";
