use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use email_bridge_core::config::Config;
use email_bridge_embed::{HttpTemplateApi, ImageApi, ImageLibrary, TemplateApi};

mod demo;
mod logging;

#[derive(Parser)]
#[command(
    name = "email-bridge",
    about = "Host/editor messaging bridge for the embedded email builder",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the host/editor handshake in-process against the template API
    Demo {
        /// Template to load once the editor is ready
        #[arg(short, long)]
        template: Option<String>,

        /// Editor document file to load as a custom template
        #[arg(long)]
        json: Option<PathBuf>,

        /// Skip the GET_TEMPLATES request
        #[arg(long)]
        no_list: bool,
    },

    /// Template API commands
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Image library commands
    Images {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show resolved settings
    Status,
}

#[derive(Subcommand)]
enum TemplateAction {
    /// List templates
    List,
    /// Print a template's stored editor document
    Show { id: String },
}

#[derive(Subcommand)]
enum ImageAction {
    /// List images
    List,
    /// Upload an image file
    Upload {
        path: PathBuf,
        /// Name to store it under (default: file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete an image
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// Check the configuration for problems
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;

    logging::init(config.logging.as_ref(), cli.verbose)?;

    match cli.command {
        Commands::Demo {
            template,
            json,
            no_list,
        } => {
            let json = match json {
                Some(path) => Some(std::fs::read_to_string(&path)?),
                None => None,
            };
            demo::run(
                &config,
                demo::DemoOptions {
                    template_id: template,
                    json,
                    list: !no_list,
                },
            )
            .await?;
        }
        Commands::Templates { action } => {
            let api = HttpTemplateApi::new(&config.api())?;
            let templates = api.fetch_templates().await?;
            match action {
                TemplateAction::List => {
                    for t in &templates {
                        let builder = if t.builder_json().is_some() { "builder" } else { "html" };
                        println!("{:<24} {:<8} {}", t.id(), builder, t.subject());
                    }
                    println!("{} template(s)", templates.len());
                }
                TemplateAction::Show { id } => {
                    let Some(template) = templates.iter().find(|t| t.id() == id) else {
                        anyhow::bail!("Template not found: {id}");
                    };
                    let document = email_bridge_embed::transform_api_template(template);
                    println!("{}", serde_json::to_string_pretty(&document)?);
                }
            }
        }
        Commands::Images { action } => {
            let api = Arc::new(HttpTemplateApi::new(&config.api())?);
            match action {
                ImageAction::List => {
                    let library = ImageLibrary::new(api);
                    for image in library.open().await? {
                        println!(
                            "{:<24} {:<16} {}",
                            image.id,
                            image.content_type,
                            image.url.as_deref().unwrap_or("-")
                        );
                    }
                }
                ImageAction::Upload { path, name } => {
                    let bytes = std::fs::read(&path)?;
                    let name = name
                        .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
                        .ok_or_else(|| anyhow::anyhow!("cannot derive a file name from {}", path.display()))?;
                    let content_type = mime_guess::from_path(&path).first_or_octet_stream();
                    let file = api
                        .upload_image(&name, content_type.essence_str(), &bytes)
                        .await?;
                    println!("Uploaded {} as {}", name, file.id);
                }
                ImageAction::Delete { id } => {
                    api.delete_image(&id).await?;
                    println!("Deleted {id}");
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Get { key } => match config.get_path(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => anyhow::bail!("No value at '{key}'"),
            },
            ConfigAction::Set { key, value } => {
                let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
                config.set_path(&key, value)?;
                config.save(&config_path)?;
                println!("Updated {key} in {}", config_path.display());
            }
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    println!("warning: {w}");
                }
                for e in &errors {
                    println!("error: {e}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} configuration error(s)", errors.len());
                }
                println!("Configuration OK");
            }
        },
        Commands::Status => {
            let api = config.api();
            println!("email-bridge v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            println!("API: {}", api.base_url);
            println!("Templates: {}", api.templates_path);
            println!("Files: {}", api.files_path);
            println!("Single-flight fetch: {}", config.single_flight());
        }
    }

    Ok(())
}
