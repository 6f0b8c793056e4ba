//! CLI definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use strata_core::{Layer, ParentPolicy, DEFAULT_PROFILE_LEVEL, DEFAULT_SETTINGS_PATH};

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about = "Layered system configuration manager")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manager settings file
    #[arg(
        long,
        global = true,
        env = "STRATA_SETTINGS",
        default_value = DEFAULT_SETTINGS_PATH
    )]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configuration values
    Show(ShowArgs),

    /// Set a value in the local configuration
    Set(SetArgs),

    /// Delete a key from the local configuration
    DeleteKey(KeyArgs),

    /// Delete a section from the local configuration
    DeleteSection(SectionArgs),

    /// Add an element to a list value
    ListAdd(ItemArgs),

    /// Remove an element from a list value
    ListRemove(ItemArgs),

    /// Add an element to a sequence value
    SequenceAdd(ItemArgs),

    /// Remove an element from a sequence value
    SequenceRemove(ItemArgs),

    /// Manage plugins
    #[command(subcommand)]
    Plugin(PluginCommands),

    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Generate the files of every enabled plugin
    Deploy(DeployArgs),

    /// Restart the services of plugins
    Restart(ServicesArgs),

    /// Reload the services of plugins
    Reload(ServicesArgs),
}

// ============================================================================
// Configuration commands
// ============================================================================

/// Which configuration to show
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayerArg {
    /// Base, profiles and local merged
    #[default]
    Effective,
    Base,
    /// Enabled profiles merged
    Profiles,
    Local,
}

impl LayerArg {
    pub fn layer(self) -> Option<Layer> {
        match self {
            LayerArg::Effective => None,
            LayerArg::Base => Some(Layer::Base),
            LayerArg::Profiles => Some(Layer::Profile),
            LayerArg::Local => Some(Layer::Local),
        }
    }
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Only this section
    pub section: Option<String>,

    /// Layer to show
    #[arg(long, value_enum, default_value_t = LayerArg::Effective)]
    pub layer: LayerArg,

    /// Convert values to the types declared by enabled plugins
    #[arg(long)]
    pub typed: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub section: String,
    pub key: String,
    pub value: String,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    pub section: String,
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SectionArgs {
    pub section: String,
}

#[derive(Args, Debug)]
pub struct ItemArgs {
    pub section: String,
    pub key: String,
    pub value: String,

    /// Fail instead of copying a list only defined in base or profiles
    #[arg(long)]
    pub no_inherit: bool,
}

impl ItemArgs {
    pub fn policy(&self) -> ParentPolicy {
        if self.no_inherit {
            ParentPolicy::Refuse
        } else {
            ParentPolicy::Inherit
        }
    }
}

// ============================================================================
// Plugin commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PluginCommands {
    /// Enable an installed plugin
    Enable(PluginNameArgs),

    /// Disable an enabled plugin
    Disable(PluginNameArgs),

    /// List installed plugins and their dependencies
    #[command(alias = "ls")]
    List(PluginListArgs),
}

#[derive(Args, Debug)]
pub struct PluginNameArgs {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct PluginListArgs {
    /// Only these plugins
    pub names: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Profile commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Enable a profile at a level
    Enable(ProfileEnableArgs),

    /// Disable a profile
    Disable(ProfileNameArgs),

    /// List installed profiles
    #[command(alias = "ls")]
    List(ProfileListArgs),
}

#[derive(Args, Debug)]
pub struct ProfileEnableArgs {
    pub name: String,

    /// Level to enable the profile at, higher levels win
    #[arg(short, long, default_value_t = DEFAULT_PROFILE_LEVEL)]
    pub level: u32,
}

#[derive(Args, Debug)]
pub struct ProfileNameArgs {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ProfileListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Deployment commands
// ============================================================================

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Restart the services of this plugin after writing (`all` for every plugin)
    #[arg(long, value_name = "PLUGIN")]
    pub restart: Vec<String>,

    /// Reload the services of this plugin after writing (`all` for every plugin)
    #[arg(long, value_name = "PLUGIN")]
    pub reload: Vec<String>,

    /// Do not back up replaced files
    #[arg(long)]
    pub no_backup: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ServicesArgs {
    /// Plugins whose services to act on (`all` for every enabled plugin)
    #[arg(required = true, value_name = "PLUGIN")]
    pub plugins: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy_options() {
        let cli = Cli::try_parse_from([
            "strata", "deploy", "--restart", "ssh", "--restart", "ntp", "--reload", "all",
            "--no-backup",
        ])
        .unwrap();
        match cli.command {
            Commands::Deploy(args) => {
                assert_eq!(args.restart, vec!["ssh", "ntp"]);
                assert_eq!(args.reload, vec!["all"]);
                assert!(args.no_backup);
                assert!(!args.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_edit_policy() {
        let cli = Cli::try_parse_from([
            "strata", "-vv", "list-add", "ntp", "servers", "pool", "--no-inherit",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::ListAdd(args) => assert_eq!(args.policy(), ParentPolicy::Refuse),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_profile_level_default() {
        let cli = Cli::try_parse_from(["strata", "profile", "enable", "jumbo"]).unwrap();
        match cli.command {
            Commands::Profile(ProfileCommands::Enable(args)) => {
                assert_eq!(args.level, DEFAULT_PROFILE_LEVEL);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_restart_requires_plugin() {
        assert!(Cli::try_parse_from(["strata", "restart"]).is_err());
    }

    #[test]
    fn test_show_layer() {
        let cli = Cli::try_parse_from(["strata", "show", "--layer", "local", "--typed"]).unwrap();
        match cli.command {
            Commands::Show(args) => {
                assert_eq!(args.layer.layer(), Some(Layer::Local));
                assert!(args.typed);
                assert_eq!(args.section, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
