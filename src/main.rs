//! rsacrypt - Hybrid RSA + AES encryption
//!
//! Usage:
//!   rsacrypt keygen                     - Generate an RSA keypair
//!   rsacrypt encrypt <in> -o <out>      - Encrypt a file
//!   rsacrypt decrypt <in> -o <out>      - Decrypt a file
//!   rsacrypt encrypt-image <image>      - Encrypt an image (stored as PNG)
//!   rsacrypt decrypt-image <in> -o <png> - Decrypt an image back to PNG

use clap::{Parser, Subcommand};
use rsacrypt::{
    config::Config,
    crypto::generate_keypair,
    file::{self, load_private_key, load_public_key},
    Error, Result,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "rsacrypt")]
#[command(author = "rsacrypt Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hybrid RSA + AES encryption for files and images")]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an RSA keypair
    Keygen {
        /// Key size in bits
        #[arg(long, value_parser = ["2048", "4096"])]
        key_size: Option<String>,

        /// Where to write the private key (PKCS#8 PEM)
        #[arg(long)]
        private_key: Option<PathBuf>,

        /// Where to write the public key (SubjectPublicKeyInfo PEM)
        #[arg(long)]
        public_key: Option<PathBuf>,
    },

    /// Encrypt a file
    Encrypt {
        /// File to encrypt
        input: PathBuf,

        /// Encrypted output file
        #[arg(short, long)]
        output: PathBuf,

        /// Public key PEM (defaults to the configured key)
        #[arg(long)]
        public_key: Option<PathBuf>,
    },

    /// Decrypt a file
    Decrypt {
        /// Encrypted file
        input: PathBuf,

        /// Decrypted output file
        #[arg(short, long)]
        output: PathBuf,

        /// Private key PEM (defaults to the configured key)
        #[arg(long)]
        private_key: Option<PathBuf>,
    },

    /// Encrypt an image, storing it losslessly as PNG before encryption
    EncryptImage {
        /// Image to encrypt
        input: PathBuf,

        /// Encrypted output file (auto-named in the output directory if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Public key PEM (defaults to the configured key)
        #[arg(long)]
        public_key: Option<PathBuf>,
    },

    /// Decrypt an encrypted image and save it as PNG
    DecryptImage {
        /// Encrypted image file
        input: PathBuf,

        /// PNG output file
        #[arg(short, long)]
        output: PathBuf,

        /// Private key PEM (defaults to the configured key)
        #[arg(long)]
        private_key: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let config_path = cli
        .config
        .as_ref()
        .map(expand_tilde)
        .unwrap_or_else(Config::default_path);

    let result = Config::load_or_default(&config_path)
        .and_then(|config| run_command(cli.command, &config));

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Keygen {
            key_size,
            private_key,
            public_key,
        } => cmd_keygen(config, key_size, private_key, public_key),

        Commands::Encrypt {
            input,
            output,
            public_key,
        } => cmd_encrypt(config, &input, &output, public_key),

        Commands::Decrypt {
            input,
            output,
            private_key,
        } => cmd_decrypt(config, &input, &output, private_key),

        Commands::EncryptImage {
            input,
            output,
            public_key,
        } => cmd_encrypt_image(config, &input, output, public_key),

        Commands::DecryptImage {
            input,
            output,
            private_key,
        } => cmd_decrypt_image(config, &input, &output, private_key),
    }
}

fn cmd_keygen(
    config: &Config,
    key_size: Option<String>,
    private_key: Option<PathBuf>,
    public_key: Option<PathBuf>,
) -> Result<()> {
    let bits = match key_size {
        Some(size) => size
            .parse::<usize>()
            .map_err(|_| Error::InvalidConfig(format!("Invalid key size: {}", size)))?,
        None => config.keys.key_size,
    };

    let private_path = private_key.or_else(|| config.keys.private_key_path.clone());
    let public_path = public_key.or_else(|| config.keys.public_key_path.clone());

    info!("Generating {}-bit RSA keypair...", bits);
    let pair = generate_keypair(bits)?;

    file::write_keypair(&pair, private_path.as_deref(), public_path.as_deref())?;

    if let Some(path) = &private_path {
        info!("Private key written to {:?}", path);
    } else {
        print!("{}", pair.private_pem());
    }

    if let Some(path) = &public_path {
        info!("Public key written to {:?}", path);
    } else {
        print!("{}", pair.public_pem());
    }

    Ok(())
}

fn cmd_encrypt(
    config: &Config,
    input: &Path,
    output: &Path,
    public_key: Option<PathBuf>,
) -> Result<()> {
    let key_path = resolve_key(public_key, &config.keys.public_key_path, "public")?;
    let public = load_public_key(&key_path)?;

    file::encrypt_file(input, output, &public)?;
    info!("Encrypted {:?} -> {:?}", input, output);
    Ok(())
}

fn cmd_decrypt(
    config: &Config,
    input: &Path,
    output: &Path,
    private_key: Option<PathBuf>,
) -> Result<()> {
    let key_path = resolve_key(private_key, &config.keys.private_key_path, "private")?;
    let private = load_private_key(&key_path)?;

    file::decrypt_file(input, output, &private)?;
    info!("Decrypted {:?} -> {:?}", input, output);
    Ok(())
}

fn cmd_encrypt_image(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    public_key: Option<PathBuf>,
) -> Result<()> {
    let key_path = resolve_key(public_key, &config.keys.public_key_path, "public")?;
    let public = load_public_key(&key_path)?;

    let payload = file::read_image(input)?;
    let written =
        file::encrypt_image_to_file(&payload, &public, output.as_deref(), &config.output)?;

    info!("Encrypted image written to {:?}", written);
    println!("{}", written.display());
    Ok(())
}

fn cmd_decrypt_image(
    config: &Config,
    input: &Path,
    output: &Path,
    private_key: Option<PathBuf>,
) -> Result<()> {
    let key_path = resolve_key(private_key, &config.keys.private_key_path, "private")?;
    let private = load_private_key(&key_path)?;

    let image = file::decrypt_image_file(input, &private)?;
    file::save_png(&image, output)?;

    info!(
        "Decrypted {}x{} image -> {:?}",
        image.width(),
        image.height(),
        output
    );
    Ok(())
}

fn resolve_key(
    explicit: Option<PathBuf>,
    configured: &Option<PathBuf>,
    kind: &str,
) -> Result<PathBuf> {
    explicit
        .or_else(|| configured.clone())
        .map(|p| expand_tilde(&p))
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "No {} key given: pass --{}-key or set it in the config file",
                kind, kind
            ))
        })
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.clone()
}
