use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use retvq::{EncodeOptions, VqfMetadata};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retvq")]
#[command(version)]
#[command(about = "TwinVQ VQF audio converter", long_about = None)]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode audio file to VQF
    Encode {
        /// Input audio file (mp3, wav, flac, ogg, etc.)
        input: PathBuf,
        /// Output VQF file
        output: PathBuf,
        /// Total bitrate in kbps (default: highest for the sample rate)
        #[arg(short, long)]
        bitrate: Option<u32>,
        /// Title metadata
        #[arg(long)]
        title: Option<String>,
        /// Artist metadata
        #[arg(long, alias = "author")]
        artist: Option<String>,
        /// Comment metadata
        #[arg(long)]
        comment: Option<String>,
    },
    /// Decode VQF file to WAV
    Decode {
        /// Input VQF file
        input: PathBuf,
        /// Output WAV file
        output: PathBuf,
    },
    /// Show information about a VQF file
    Info {
        /// Input VQF file
        input: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that a VQF file decodes
    Validate {
        /// Input VQF file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Encode {
            input,
            output,
            bitrate,
            title,
            artist,
            comment,
        } => encode(EncodeArgs {
            input,
            output,
            bitrate,
            title,
            artist,
            comment,
        }),
        Commands::Decode { input, output } => decode(&input, &output),
        Commands::Info { input, json } => info(&input, json),
        Commands::Validate { input } => validate(&input),
    }
}

struct EncodeArgs {
    input: PathBuf,
    output: PathBuf,
    bitrate: Option<u32>,
    title: Option<String>,
    artist: Option<String>,
    comment: Option<String>,
}

fn encode(args: EncodeArgs) -> Result<()> {
    println!("Reading {}...", args.input.display());

    let source = retvq::audio::read_audio_file(&args.input)?;

    if source.samples.is_empty() {
        bail!("No audio samples in input");
    }

    println!("  Sample rate: {} Hz", source.sample_rate);
    println!("  Channels: {}", source.channels);
    println!("  Duration: {:.2}s", source.duration_secs());

    let mut options = EncodeOptions {
        bitrate: args.bitrate,
        metadata: None,
    };
    if args.title.is_some() || args.artist.is_some() || args.comment.is_some() {
        options = options.with_metadata(VqfMetadata::with_basic(
            args.title.or(source.metadata.title.clone()),
            args.artist.or(source.metadata.artist.clone()),
            args.comment.or(source.metadata.comment.clone()),
        ));
    }

    println!("Encoding...");

    let vqf_data = retvq::encode_from_samples(
        &source.samples,
        source.sample_rate,
        source.channels,
        source.metadata,
        options,
    )?;

    fs::write(&args.output, &vqf_data).context("Failed to write output file")?;

    // against 16-bit PCM
    let original_size = source.samples.len() * 2;
    let ratio = original_size as f64 / vqf_data.len() as f64;

    println!("Done!");
    println!("  Output: {}", args.output.display());
    println!("  Size: {} bytes ({:.1}x compression)", vqf_data.len(), ratio);

    Ok(())
}

fn decode(input: &PathBuf, output: &PathBuf) -> Result<()> {
    println!("Reading {}...", input.display());

    let vqf_data = fs::read(input).context("Failed to read VQF file")?;
    let file_info = retvq::get_vqf_info(&vqf_data)?;

    println!("  Sample rate: {} Hz", file_info.sample_rate);
    println!("  Channels: {}", file_info.channels);
    println!("  Duration: {:.2}s", file_info.duration_secs);

    println!("Decoding...");

    let (samples, sample_rate, channels) =
        retvq::decode_to_samples(&vqf_data).context("Failed to decode VQF file")?;

    println!("Writing WAV...");

    retvq::audio::write_wav(output, &samples, sample_rate, channels)?;

    println!("Done!");
    println!("  Output: {}", output.display());

    Ok(())
}

fn info(input: &PathBuf, json: bool) -> Result<()> {
    let vqf_data = fs::read(input).context("Failed to read VQF file")?;
    let file_info = retvq::get_vqf_info(&vqf_data)?;

    if json {
        let mut value = serde_json::to_value(&file_info)?;
        value["metadata"] = file_info.metadata.to_json();
        let (setup, conf) = retvq::get_session_config(&vqf_data)?;
        value["setup"] = serde_json::to_value(&setup)?;
        value["conf"] = serde_json::to_value(&conf)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("VQF Audio File");
    println!("───────────────────────────────");
    println!("  Version:     {}", file_info.version);
    println!("  Mode:        {}", file_info.mode);
    println!("  Sample rate: {} Hz", file_info.sample_rate);
    println!("  Channels:    {}", file_info.channels);
    println!("  Bitrate:     {} kbps", file_info.bit_rate);
    println!("  Duration:    {:.2}s", file_info.duration_secs);
    println!("  Frames:      {}", file_info.total_frames);
    println!("  File size:   {} bytes", file_info.file_size);

    if !file_info.metadata.is_empty() {
        println!();
        println!("Metadata");
        println!("───────────────────────────────");
        for chunk in &file_info.metadata.chunks {
            println!("  {}: {}", chunk.tag, chunk.value);
        }
    }

    Ok(())
}

fn validate(input: &PathBuf) -> Result<()> {
    let vqf_data = fs::read(input).context("Failed to read VQF file")?;

    if retvq::validate_vqf(&vqf_data)? {
        println!("{}: ok", input.display());
        Ok(())
    } else {
        bail!("{}: frames failed to decode", input.display())
    }
}
