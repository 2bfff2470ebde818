//! CLI argument parsing for the studio site tools.
//!
//! Each content endpoint of the site is a subcommand that prints the JSON the
//! endpoint would return; admin mutations take `--password`.
use crate::admin::DEFAULT_HASH_COST;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Environment variable naming the site root when `--site` is absent.
pub const SITE_ENV: &str = "STUDIO_SITE";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "studio",
    version,
    about = "Artist portfolio site tools: acquisition inquiries, gallery and about content",
    after_help = "Examples:\n  studio init --site ./site\n  studio inquire --site ./site\n  studio submit --site ./site --payload inquiry.json\n  studio gallery show --site ./site\n  studio gallery save --site ./site --from gallery.json --password secret\n  studio resolve image images/tide.jpg --site ./site",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Site root containing studio.json, data/, and public/ (default: $STUDIO_SITE or .)
    #[arg(long, value_name = "DIR", global = true)]
    pub site: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl RootArgs {
    pub fn site_root(&self) -> PathBuf {
        self.site
            .clone()
            .or_else(|| std::env::var_os(SITE_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Inquire(InquireArgs),
    Submit(SubmitArgs),
    /// Read or edit gallery works
    #[command(subcommand)]
    Gallery(GalleryCommand),
    /// Read or edit the about page
    #[command(subcommand)]
    About(AboutCommand),
    /// Upload images and list raw uploads
    #[command(subcommand)]
    Image(ImageCommand),
    /// Admin password helpers
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Resolve deployment paths
    #[command(subcommand)]
    Resolve(ResolveCommand),
}

/// Init command inputs for bootstrapping a site.
#[derive(Parser, Debug)]
#[command(about = "Initialize a site (studio.json + empty data files)")]
pub struct InitArgs {
    /// URL prefix the site is served under (e.g. /portfolio)
    #[arg(long, value_name = "PATH")]
    pub base_path: Option<String>,

    /// Admin password to hash into studio.json
    #[arg(long, value_name = "PASSWORD")]
    pub admin_password: Option<String>,

    /// Bcrypt cost for the admin password hash
    #[arg(
        long,
        value_name = "COST",
        default_value_t = DEFAULT_HASH_COST,
        value_parser = clap::value_parser!(u32).range(4..=31)
    )]
    pub cost: u32,

    /// Overwrite an existing studio.json
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run the acquisition inquiry wizard")]
pub struct InquireArgs {
    /// JSON object of answers keyed by field name; skips the prompts
    #[arg(long, value_name = "PATH")]
    pub answers: Option<PathBuf>,

    /// Bot verification token issued to this client
    #[arg(long, value_name = "TOKEN")]
    pub recaptcha_token: Option<String>,

    /// Log the inquiry instead of forwarding it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Handle a submitInquiry request body (stdin when --payload is absent)")]
pub struct SubmitArgs {
    /// Path to the JSON request body
    #[arg(long, value_name = "PATH")]
    pub payload: Option<PathBuf>,

    /// Log the inquiry instead of forwarding it
    #[arg(long)]
    pub dry_run: bool,
}

/// Admin password shared by mutation commands.
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Admin password
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum GalleryCommand {
    /// Print data/gallery.json
    Show,
    /// Replace the gallery with a JSON body ({works: [...]})
    Save {
        /// Path to the JSON body
        #[arg(long, value_name = "PATH")]
        from: PathBuf,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Append a work with a generated id
    Add(AddWorkArgs),
    /// Remove a work by id
    Remove {
        #[arg(long, value_name = "ID")]
        id: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Report which gallery images resolve, following the fallback chain
    Check,
}

#[derive(Args, Debug)]
pub struct AddWorkArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub category: String,
    #[arg(long, default_value = "")]
    pub year: String,
    #[arg(long, default_value = "")]
    pub medium: String,
    #[arg(long, default_value = "")]
    pub dimensions: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Image path as stored in the gallery (e.g. /images/work-abc.jpg)
    #[arg(long, value_name = "PATH", default_value = "")]
    pub image_url: String,
    /// Mark the work as sold (drops any price)
    #[arg(long)]
    pub sold: bool,
    #[arg(long)]
    pub price: Option<String>,
    #[command(flatten)]
    pub auth: AuthArgs,
}

#[derive(Subcommand, Debug)]
pub enum AboutCommand {
    /// Print data/about.json
    Show,
    /// Replace the about page with a JSON body
    Save {
        /// Path to the JSON body
        #[arg(long, value_name = "PATH")]
        from: PathBuf,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImageCommand {
    /// Copy an image into public/images under a generated name
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// List files in public/uploads
    Uploads,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Print the bcrypt hash of a password for studio.json
    HashPassword {
        #[arg(value_name = "PASSWORD")]
        password: String,
        /// Bcrypt cost
        #[arg(
            long,
            value_name = "COST",
            default_value_t = DEFAULT_HASH_COST,
            value_parser = clap::value_parser!(u32).range(4..=31)
        )]
        cost: u32,
    },
    /// Check a password against studio.json
    Verify {
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResolveCommand {
    /// Resolve an image reference against the base path
    Image {
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },
    /// Resolve the API base, or one endpoint under it
    Api {
        #[arg(long, value_name = "NAME")]
        endpoint: Option<String>,
    },
}
