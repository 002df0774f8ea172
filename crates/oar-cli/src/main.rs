use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use oar_core::config::{self, CONFIG_FILE_NAME, OarConfig};
use oar_core::document;
use oar_core::migrate::{CLI_CONFIG, LEGACY_CONFIG};
use oar_core::split::ENTRYPOINT;
use oar_core::{
    AssumeYes, ComponentGroup, Confirm, GeneratedFile, MigrateOptions, MigrationOutcome,
    SplitOptions, Warnings,
};
use oar_scaffold::ScaffoldOptions;

#[derive(Parser)]
#[command(name = "oar", about = "OpenAPI repository toolkit", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new OpenAPI repository in the current directory
    Create {
        /// Directory for the split definition
        openapi_dir: Option<String>,

        /// Directory for the docs page
        docs_dir: Option<String>,

        /// Existing OpenAPI 3.x definition to split (YAML or JSON)
        #[arg(short, long)]
        definition: Option<PathBuf>,

        /// API name, defaults to the definition's info.title
        #[arg(short, long)]
        title: Option<String>,

        /// Keep code samples inline instead of preparing code_samples/
        #[arg(long)]
        no_code_samples: bool,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Split a definition into paths/ and components/ files
    Split {
        /// Path to the OpenAPI definition (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "openapi")]
        output: PathBuf,
    },

    /// Fold a split repository back into one document
    Bundle {
        /// Entrypoint of the split repository
        #[arg(short, long, default_value = "openapi/openapi.yaml")]
        input: PathBuf,

        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: BundleFormat,
    },

    /// Migrate a v2 repository (redocly.yaml + spec/) to the current layout
    Migrate {
        /// Repository root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Validate an OpenAPI definition
    Validate {
        /// Path to the OpenAPI definition
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new oar configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum BundleFormat {
    Yaml,
    Json,
}

/// Asks on stderr and reads the answer from stdin. Anything but `y`/`yes`
/// declines.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        eprint!("{message} [y/N] ");
        if io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            openapi_dir,
            docs_dir,
            definition,
            title,
            no_code_samples,
            yes,
        } => cmd_create(CreateArgs {
            openapi_dir,
            docs_dir,
            definition,
            title,
            no_code_samples,
            yes,
        }),

        Commands::Split { input, output } => cmd_split(input, output),

        Commands::Bundle {
            input,
            output,
            format,
        } => cmd_bundle(input, output, format),

        Commands::Migrate { root, yes } => cmd_migrate(root, yes),

        Commands::Validate { input } => cmd_validate(input),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "oar", &mut io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<OarConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    let loaded = config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))?;
    if let Some(cfg) = &loaded {
        log::debug!("loaded {}: {cfg:?}", config_path.display());
    }
    Ok(loaded)
}

/// Write generated files to disk under the given base directory.
fn write_files(base: &Path, files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        let path = base.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("  wrote {}", path.display());
    }
    Ok(())
}

fn print_warnings(warnings: &Warnings) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("\n{} warning(s):", warnings.len());
    for warning in warnings {
        eprintln!("  - {warning}");
    }
}

struct CreateArgs {
    openapi_dir: Option<String>,
    docs_dir: Option<String>,
    definition: Option<PathBuf>,
    title: Option<String>,
    no_code_samples: bool,
    yes: bool,
}

fn cmd_create(args: CreateArgs) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();

    for existing in [LEGACY_CONFIG, CLI_CONFIG] {
        if Path::new(existing).exists() {
            anyhow::bail!(
                "the current directory already contains {existing}. Choose another directory or remove its contents."
            );
        }
    }

    let openapi_dir = args.openapi_dir.unwrap_or(cfg.openapi_dir);
    let docs_dir = args.docs_dir.unwrap_or(cfg.docs_dir);
    let definition = args.definition.or_else(|| cfg.definition.map(PathBuf::from));
    let has_definition = definition.is_some();

    let mut doc = match &definition {
        Some(path) => document::load(path)?,
        None => document::from_yaml(oar_scaffold::starter_definition())
            .context("starter definition should parse")?,
    };

    let api_title = args
        .title
        .or_else(|| {
            has_definition
                .then(|| document::title(&doc).map(str::to_string))
                .flatten()
        })
        .filter(|title| !title.trim().is_empty())
        .context("API name can't be empty, pass --title")?;

    if !has_definition {
        doc["info"]["title"] = serde_yaml_ng::Value::String(api_title.clone());
    }
    let code_samples = cfg.code_samples && !args.no_code_samples;

    let message = format!(
        "The following folders will be created: {openapi_dir} and {docs_dir}\n\
         You can change them by running `oar create <openapi_dir> <docs_dir>`\nProceed?"
    );
    if !args.yes && !StdinConfirm.confirm(&message) {
        eprintln!("Cancelled.");
        return Ok(());
    }

    eprintln!("Creating a new OpenAPI repo for {api_title}");
    let files = oar_scaffold::emit_scaffold(&ScaffoldOptions {
        api_title: api_title.clone(),
        openapi_dir: openapi_dir.clone(),
        docs_dir: docs_dir.clone(),
        code_samples,
    })?;
    write_files(Path::new("."), &files)?;

    let options = SplitOptions {
        discriminator: cfg.discriminator,
        inline_code_samples: !code_samples,
    };
    let report = oar_core::split(doc, Path::new(&openapi_dir), &options)
        .with_context(|| format!("failed to split definition into {openapi_dir}"))?;
    eprintln!(
        "  split {} paths and {} components into {openapi_dir}",
        report.paths.len(),
        report.components.len()
    );
    print_warnings(&report.warnings);

    eprintln!(
        "\nSuccess! Created {openapi_dir}.

Install the tooling and start a repository:

  npm install
  git init && git add . && git commit -m \"Initial commit\"

Then you can run:

  npm start
    Starts the docs preview server.

  npm run build
    Bundles the definition.

  npm test
    Validates the definition."
    );
    Ok(())
}

fn cmd_split(input: PathBuf, output: PathBuf) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let doc = document::load(&input)?;

    let options = SplitOptions {
        discriminator: cfg.discriminator,
        inline_code_samples: !cfg.code_samples,
    };
    let report = oar_core::split(doc, &output, &options)
        .with_context(|| format!("failed to split {}", input.display()))?;

    eprintln!(
        "Split {} into {}: {} paths, {} components, {} code samples",
        input.display(),
        output.join(ENTRYPOINT).display(),
        report.paths.len(),
        report.components.len(),
        report.code_samples.len()
    );
    print_warnings(&report.warnings);
    Ok(())
}

fn cmd_bundle(input: PathBuf, output: Option<PathBuf>, format: BundleFormat) -> Result<()> {
    let doc = oar_core::bundle(&input)
        .with_context(|| format!("failed to bundle {}", input.display()))?;

    let rendered = match format {
        BundleFormat::Yaml => serde_yaml_ng::to_string(&doc)?,
        BundleFormat::Json => serde_json::to_string_pretty(&doc)? + "\n",
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Bundled {} into {}", input.display(), path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_migrate(root: PathBuf, yes: bool) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let options = MigrateOptions {
        discriminator: cfg.discriminator,
    };

    eprintln!("Starting the repository migration...");
    let outcome = if yes {
        oar_core::migrate(&root, &options, &mut AssumeYes)?
    } else {
        oar_core::migrate(&root, &options, &mut StdinConfirm)?
    };

    let report = match outcome {
        MigrationOutcome::Cancelled => {
            eprintln!("Cancelled, nothing was changed.");
            return Ok(());
        }
        MigrationOutcome::Completed(report) => report,
    };

    eprintln!(
        "Migrated {} paths and {} components into {}",
        report.paths.len(),
        report.components,
        report.openapi_dir.display()
    );
    print_warnings(&report.warnings);
    eprintln!(
        "
Automatic migration completed successfully.

To finish, update dependencies by running:

  npm install

After that, verify your migration by running:

  npm test

The new validation tool may find new issues in your API definition.
Fix them or override the error levels in the rules section of {CLI_CONFIG}."
    );
    Ok(())
}

fn cmd_validate(input: PathBuf) -> Result<()> {
    let doc = document::load(&input)?;

    let field = |key: &str| {
        doc.get(key)
            .and_then(document::scalar_to_string)
            .unwrap_or_default()
    };
    eprintln!(
        "Valid OpenAPI {} definition: {}",
        field("openapi"),
        document::title(&doc).unwrap_or("<untitled>")
    );
    if let Some(version) = doc.get("info").and_then(|info| info.get("version")) {
        eprintln!(
            "  Version: {}",
            document::scalar_to_string(version).unwrap_or_default()
        );
    }
    let paths = doc
        .get("paths")
        .and_then(|paths| paths.as_mapping())
        .map_or(0, |paths| paths.len());
    eprintln!("  Paths: {paths}");

    if let Some(components) = doc.get("components") {
        for group in ComponentGroup::ALL {
            if let Some(entries) = components.get(group.as_str()).and_then(|g| g.as_mapping()) {
                eprintln!("  {group}: {}", entries.len());
            }
        }
    }

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
