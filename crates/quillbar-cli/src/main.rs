//! Quillbar CLI - clipboard text transformations and image generation

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use quillbar_core::clipboard::{Clipboard, ClipboardSink, MemoryClipboard, SystemClipboard};
use quillbar_core::config::{self, Config, Credentials, IMAGE_TOKEN_ENV};
use quillbar_core::image::{IMAGE_MODELS, ImageModel};
use quillbar_core::operation::Operation;
use quillbar_core::session::{Processed, Session};
use quillbar_core::transform::render_output;
use quillbar_core::worker::SessionEvent;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "quillbar")]
#[command(author, version, about = "Clipboard text transformations and image generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform text with one of the operations
    Transform {
        /// Operation (proofread, rewrite, friendly, professional, concise,
        /// summary, key-points, table, list)
        #[arg(value_parser = parse_operation)]
        operation: Operation,
        /// Text to transform (defaults to the clipboard contents)
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Image generation
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,

    /// Interactive menu (default)
    Menu,
}

#[derive(Subcommand)]
enum ImageAction {
    /// Generate an image from a prompt
    Generate {
        prompt: String,
        /// Model identifier (owner/name)
        #[arg(short, long)]
        model: Option<String>,
        /// Aspect ratio, e.g. 16:9
        #[arg(short, long)]
        aspect_ratio: Option<String>,
        #[arg(long)]
        disable_safety_checker: bool,
        /// Save the first image to this file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List available image models
    Models,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store the API key (prompts when omitted)
    Set { key: Option<String> },
    /// Show the stored API key (redacted)
    Show,
    /// Remove the stored API key
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show configuration file path
    Path,
}

fn parse_operation(value: &str) -> Result<Operation, String> {
    value.parse().map_err(|e: quillbar_core::Error| e.to_string())
}

/// Convert a core error into a report with its code and hint
fn report(err: quillbar_core::Error) -> anyhow::Error {
    match err.suggestion() {
        Some(hint) => anyhow!("[{}] {}: {}\n  Hint: {}", err.code(), err.title(), err, hint),
        None => anyhow!("[{}] {}: {}", err.code(), err.title(), err),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quillbar=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Transform { operation, text } => cmd_transform(operation, text, cli.quiet).await,
        Commands::Image { action } => cmd_image(action, cli.quiet).await,
        Commands::Key { action } => cmd_key(action, cli.quiet),
        Commands::Config { action } => cmd_config(action, cli.quiet),
        Commands::Doctor => cmd_doctor(cli.quiet),
        Commands::Menu => cmd_menu(cli.quiet).await,
    }
}

/// Load settings and the API key, asking for the key when it is missing
fn open_session(quiet: bool) -> anyhow::Result<Session> {
    let config = Config::load()?;
    let mut credentials = Credentials::load()?;

    if credentials.api_key().is_none() {
        if std::io::stdin().is_terminal() {
            if let Some(key) = prompt_api_key()? {
                credentials = Credentials::new(key);
                credentials.save()?;
                if !quiet {
                    println!("API key saved to {}", Credentials::path()?.display());
                }
            }
        }
        if credentials.api_key().is_none() {
            eprintln!("No API key provided. AI processing will not work.");
        }
    }

    Ok(Session::new(config, credentials))
}

fn prompt_api_key() -> anyhow::Result<Option<String>> {
    let mut editor = DefaultEditor::new()?;
    match editor.readline("Please enter your OpenAI API key: ") {
        Ok(line) => Ok(Some(line.trim().to_string()).filter(|key| !key.is_empty())),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn cmd_transform(operation: Operation, text: Option<String>, quiet: bool) -> anyhow::Result<()> {
    let mut session = open_session(quiet)?;

    let processed = match text {
        // Given text never touches the system clipboard
        Some(text) => {
            let mut sink = ClipboardSink::new(MemoryClipboard::new(text.as_str()));
            let mut processed = session
                .process(operation, &text, &mut sink)
                .await
                .map_err(report)?;
            processed.display = render_output(&processed.outcome.result);
            processed
        }
        None => {
            let mut clipboard = SystemClipboard;
            let input = clipboard.read_text().map_err(report)?;
            session
                .process(operation, &input, &mut ClipboardSink::new(clipboard))
                .await
                .map_err(report)?
        }
    };
    print_processed(&processed, quiet);

    session.shutdown();
    Ok(())
}

/// Print a transformation result with its warnings on stderr
fn print_processed(processed: &Processed, quiet: bool) {
    if let Some(err) = &processed.publish_error {
        eprintln!("Warning: {}", err);
    }
    if let Some(mismatch) = processed.outcome.mismatch() {
        eprintln!("Warning: {}", mismatch);
    }

    if quiet {
        println!("{}", processed.outcome.result.output_text);
    } else {
        println!("{}", processed.display);
    }
}

async fn cmd_image(action: ImageAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ImageAction::Models => {
            for model in IMAGE_MODELS {
                if quiet {
                    println!("{}", model.id);
                } else {
                    println!("{:<30} {:<14} {}", model.id, model.name, model.description);
                }
            }
            Ok(())
        }
        ImageAction::Generate {
            prompt,
            model,
            aspect_ratio,
            disable_safety_checker,
            output,
        } => {
            let config = Config::load()?;
            let mut session = Session::new(config, Credentials::default());

            let mut job = session.prepare_image_job(&prompt).map_err(report)?;
            if let Some(model) = model {
                if ImageModel::by_id(&model).is_none() {
                    warn!(model = %model, "Model is not in the known model list");
                }
                job = job.with_model(model);
            }
            if let Some(aspect_ratio) = aspect_ratio {
                config::validate_aspect_ratio(&aspect_ratio)?;
                job = job.with_aspect_ratio(aspect_ratio);
            }
            job = job.with_safety_checker_disabled(disable_safety_checker);

            let model = job.model.clone();
            session.start_image(job).map_err(report)?;
            if !quiet {
                println!("Generating image with {}...", model);
            }

            let event = session
                .wait_for_event()
                .await
                .ok_or_else(|| anyhow!("Image generation ended without a result"))?;
            let failed = !matches!(event, SessionEvent::ImageFinished(_));
            print_image_event(&mut session, event, quiet);
            if failed {
                bail!("Image generation failed");
            }

            if let Some(path) = output {
                let saved = session.download_last_image(&path).await.map_err(report)?;
                if !quiet {
                    println!("Image downloaded successfully: {}", saved.display());
                }
            }

            session.shutdown();
            Ok(())
        }
    }
}

/// Print the status line of a worker completion and its URLs
fn print_image_event(session: &mut Session, event: SessionEvent, quiet: bool) {
    let urls = match &event {
        SessionEvent::ImageFinished(output) => output.urls.clone(),
        _ => Vec::new(),
    };
    let failed = !matches!(event, SessionEvent::ImageFinished(_));
    let status = session.apply(event);

    if failed {
        eprintln!("{}", status);
        return;
    }
    if !quiet {
        println!("{}", status);
    }
    for url in urls {
        println!("{}", url);
    }
}

fn cmd_key(action: KeyAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        KeyAction::Set { key } => {
            let key = match key {
                Some(key) => Some(key.trim().to_string()).filter(|key| !key.is_empty()),
                None => prompt_api_key()?,
            };
            let Some(key) = key else {
                bail!("No API key provided");
            };

            Credentials::new(key).save()?;
            if !quiet {
                println!("API key saved to {}", Credentials::path()?.display());
            }
        }
        KeyAction::Show => {
            let credentials = Credentials::load()?;
            match credentials.redacted() {
                Some(redacted) => println!("{}", redacted),
                None => println!("No API key configured."),
            }
        }
        KeyAction::Clear => {
            Credentials::default().save()?;
            if !quiet {
                println!("API key removed.");
            }
        }
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            for (key, value) in items {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn cmd_doctor(quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("Quillbar Health Check");
        println!("=====================");
        println!();
    }

    let mut all_ok = true;

    match Config::load().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
                println!("     Model: {}", config.llm.model);
                println!("     Image model: {}", config.image.default_model);
            }
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {}", e);
            }
        }
    }

    match Credentials::load() {
        Ok(credentials) => match credentials.redacted() {
            Some(redacted) => {
                if !quiet {
                    println!("[OK] API Key: Configured ({})", redacted);
                }
            }
            None => {
                all_ok = false;
                if !quiet {
                    println!("[!!] API Key: Not configured");
                    println!("     Run `quillbar key set`");
                }
            }
        },
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] API Key: Error - {}", e);
            }
        }
    }

    if Credentials::image_token().is_some() {
        if !quiet {
            println!("[OK] Image token: Configured");
        }
    } else if !quiet {
        println!("[--] Image token: Not configured (image generation disabled)");
        println!("     Set {} environment variable", IMAGE_TOKEN_ENV);
    }

    if !quiet {
        match Config::config_path() {
            Ok(path) => {
                if path.exists() {
                    println!("[OK] Config file: {}", path.display());
                } else {
                    println!("[--] Config file: {} (using defaults)", path.display());
                }
            }
            Err(e) => {
                println!("[!!] Config file: Error - {}", e);
            }
        }
        println!();
    }

    if all_ok {
        if !quiet {
            println!("All checks passed.");
        }
        Ok(())
    } else {
        bail!("Some checks failed")
    }
}

/// A line typed at the menu prompt
#[derive(Debug, PartialEq, Eq)]
enum MenuCommand {
    Run(Operation),
    Image(String),
    LastPrompt,
    Download(PathBuf),
    Ask(String),
    Wait,
    Help,
    Exit,
    Unknown(String),
}

impl MenuCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Ok(operation) = line.parse::<Operation>() {
            return MenuCommand::Run(operation);
        }

        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map(|(command, rest)| (command, rest.trim()))
            .unwrap_or((line, ""));

        match command.to_lowercase().as_str() {
            "image" => MenuCommand::Image(rest.to_string()),
            "last-prompt" => MenuCommand::LastPrompt,
            "download" if rest.is_empty() => MenuCommand::Download(PathBuf::from(".")),
            "download" => MenuCommand::Download(PathBuf::from(rest)),
            "ask" => MenuCommand::Ask(rest.to_string()),
            "wait" => MenuCommand::Wait,
            "help" | "?" => MenuCommand::Help,
            "exit" | "quit" => MenuCommand::Exit,
            _ => MenuCommand::Unknown(line.to_string()),
        }
    }
}

fn print_menu_help() {
    println!("Operations (act on the clipboard text):");
    for operation in Operation::ALL {
        println!("  {:<14} {}", operation.slug(), operation.menu_label());
    }
    println!();
    println!("Other commands:");
    println!("  image <prompt>   Generate an image in the background");
    println!("  last-prompt      Show the prompt of the last generated image");
    println!("  download [path]  Save the last generated image");
    println!("  ask <question>   Ask about the last processed text");
    println!("  wait             Wait for the running image generation");
    println!("  help             Show this help");
    println!("  exit             Quit");
}

fn drain_events(session: &mut Session, quiet: bool) {
    while let Some(event) = session.try_next_event() {
        print_image_event(session, event, quiet);
    }
}

async fn cmd_menu(quiet: bool) -> anyhow::Result<()> {
    let mut session = open_session(quiet)?;
    let mut editor = DefaultEditor::new()?;
    let mut clipboard = SystemClipboard;

    if !quiet {
        print_menu_help();
    }

    loop {
        drain_events(&mut session, quiet);

        let line = match editor.readline("quillbar> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                session.shutdown();
                return Err(e.into());
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line.as_str());

        let result = match MenuCommand::parse(&line) {
            MenuCommand::Exit => break,
            MenuCommand::Help => {
                print_menu_help();
                Ok(())
            }
            MenuCommand::Run(operation) => {
                run_operation(&mut session, &mut clipboard, operation, quiet).await
            }
            MenuCommand::Image(prompt) => session
                .prepare_image_job(&prompt)
                .and_then(|job| session.start_image(job))
                .map(|job_id| {
                    debug!(job_id = %job_id, "Image job started");
                    if !quiet {
                        println!("Generating image for: {}", prompt);
                    }
                }),
            MenuCommand::LastPrompt => session.last_prompt().map(|prompt| println!("{}", prompt)),
            MenuCommand::Download(path) => session
                .download_last_image(&path)
                .await
                .map(|saved| println!("Image downloaded successfully: {}", saved.display())),
            MenuCommand::Ask(question) => session.ask(&question).await.map(|answer| {
                if !quiet {
                    println!("Question: {}\n", question);
                }
                println!("{}", answer);
            }),
            MenuCommand::Wait => {
                match session.wait_for_event().await {
                    Some(event) => print_image_event(&mut session, event, quiet),
                    None => println!("No image generation in progress."),
                }
                Ok(())
            }
            MenuCommand::Unknown(input) => {
                eprintln!("Unknown command '{}'. Type `help` for the list.", input);
                Ok(())
            }
        };

        if let Err(e) = result {
            eprintln!("{}", report(e));
        }
    }

    session.shutdown();
    Ok(())
}

async fn run_operation(
    session: &mut Session,
    clipboard: &mut SystemClipboard,
    operation: Operation,
    quiet: bool,
) -> quillbar_core::Result<()> {
    let input = clipboard.read_text()?;
    let mut sink = ClipboardSink::new(*clipboard);

    let processed = session.process(operation, &input, &mut sink).await?;
    print_processed(&processed, quiet);
    Ok(())
}
