//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};
use ss3link_config::{
    AuthSection, HttpSection, Ss3Config, StreamSection, TlsSection, USER_CONFIG_FILE,
};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Write a config file with the defaults spelled out
    Init,

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init => cmd_init(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = &loaded.config;

    println!("# ss3link Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    let oauth = ctx.oauth_config();
    println!("OAuth:");
    println!("  client_id: {}", oauth.client_id);
    println!("  token_url: {}", oauth.token_url);
    println!();

    println!("Endpoints:");
    println!(
        "  api:    {}",
        config
            .api()
            .base_url
            .unwrap_or_else(|| ss3link_client::DEFAULT_API_BASE.to_string())
    );
    println!(
        "  stream: {}",
        config
            .stream()
            .url
            .unwrap_or_else(|| ss3link_stream::DEFAULT_STREAM_URL.to_string())
    );
    println!();

    let tls = config.tls();
    println!("TLS:");
    for (name, path) in [
        ("auth", &tls.auth_ca_cert),
        ("api", &tls.api_ca_cert),
        ("stream", &tls.stream_ca_cert),
    ] {
        match path {
            Some(p) => println!("  {:<7} {}", name, p.display()),
            None => println!("  {:<7} (built-in)", name),
        }
    }
    println!("  verify_unpinned: {}", tls.verify_unpinned);
    println!();

    let auth = config.auth();
    let stream = config.stream();
    println!("Timing:");
    println!("  refresh buffer: {}s", auth.refresh_buffer().as_secs());
    println!("  token check:    {}s", auth.check_interval().as_secs());
    println!("  stream poll:    {}ms", stream.poll_interval().as_millis());
    println!("  max backoff:    {}s", stream.max_backoff().as_secs());
    println!("  handshake:      {}s", stream.handshake_timeout().as_secs());
    println!("  http timeout:   {}s", config.http().timeout().as_secs());
    println!();

    println!("Credentials: {}", ctx.credentials_path().display());
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {}", w);
        }
        println!();
    }

    if ctx.verbose {
        println!("---\nRaw config:\n");
        if let Ok(toml_str) = config.to_toml() {
            println!("{}", toml_str);
        }
    }

    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    println!("Config file search order (later overrides earlier):\n");

    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    Ok(())
}

fn cmd_init(ctx: &Context) -> Result<()> {
    let path = ctx.config_dir.join(USER_CONFIG_FILE);
    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let config = Ss3Config {
        stream: Some(StreamSection::default()),
        tls: Some(TlsSection::default()),
        auth: Some(AuthSection::default()),
        http: Some(HttpSection::default()),
        ..Ss3Config::new()
    };
    ss3link_config::save_config(&config, &path)?;

    println!("Created {}", path.display());
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    println!("{}", ctx.config_dir.join(USER_CONFIG_FILE).display());
    Ok(())
}
