use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use rbzip2::{BzError, BzReader, BzWriter};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "A Rust implementation of the bzip2 block-sorting file compressor"
)]
struct Args {
    /// Files to process; compresses stdin to stdout when empty
    files: Vec<String>,

    /// Force compression
    #[clap(short = 'z', long = "compress")]
    compress: bool,

    /// Force decompression
    #[clap(short = 'd', long = "decompress")]
    decompress: bool,

    /// Keep (don't delete) input files
    #[clap(short = 'k', long = "keep")]
    keep: bool,

    /// Overwrite existing output files
    #[clap(short = 'f', long = "force")]
    force: bool,

    /// Write to standard output
    #[clap(short = 'c', long = "stdout")]
    stdout: bool,

    /// Test compressed file integrity without writing anything
    #[clap(short = 't', long = "test")]
    test: bool,

    /// Block size 1-9, in units of 100k
    #[clap(short = 'b', long = "block-size", default_value_t = 9)]
    block_size: u32,

    /// Verbosity; repeat for more detail
    #[clap(short = 'v', parse(from_occurrences))]
    verbose: usize,

    /// Sorter effort budget, raise for highly repetitive data
    #[clap(long = "work-factor", default_value_t = 50)]
    work_factor: u32,
}

fn main() {
    let args = Args::parse();

    // Available log levels are Error, Warn, Info, Debug, Trace
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .unwrap();

    if let Err(e) = run(&args) {
        error!("{}", e);
        exit(1);
    }
}

fn run(args: &Args) -> Result<(), BzError> {
    if args.files.is_empty() {
        let stdin = io::stdin();
        let stdout = io::stdout();
        if args.decompress || args.test {
            decompress_stream(stdin.lock(), stdout.lock(), args.test)?;
        } else {
            compress_stream(stdin.lock(), stdout.lock(), args)?;
        }
        return Ok(());
    }
    for name in &args.files {
        process_file(name, args)?;
    }
    Ok(())
}

fn compress_stream<R: Read, W: Write>(
    mut input: R,
    output: W,
    args: &Args,
) -> Result<(), BzError> {
    let mut writer = BzWriter::new(output, args.block_size).with_work_factor(args.work_factor);
    io::copy(&mut input, &mut writer)?;
    writer.finish()?;
    Ok(())
}

fn decompress_stream<R: Read, W: Write>(
    input: R,
    mut output: W,
    test_only: bool,
) -> Result<(), BzError> {
    let mut reader = BzReader::new(input);
    if test_only {
        io::copy(&mut reader, &mut io::sink())?;
        info!("ok, {} blocks", reader.blocks_decoded());
    } else {
        io::copy(&mut reader, &mut output)?;
        output.flush()?;
    }
    Ok(())
}

fn process_file(name: &str, args: &Args) -> Result<(), BzError> {
    let path = Path::new(name);
    let input = File::open(path)?;
    let decompress =
        args.decompress || args.test || (name.ends_with(".bz2") && !args.compress);

    if args.test {
        decompress_stream(input, io::sink(), true)?;
        info!("{}: ok", name);
        return Ok(());
    }

    if args.stdout {
        let stdout = io::stdout();
        if decompress {
            decompress_stream(input, stdout.lock(), false)?;
        } else {
            compress_stream(input, stdout.lock(), args)?;
        }
        return Ok(());
    }

    let out_path: PathBuf = if decompress {
        match name.strip_suffix(".bz2") {
            Some(stem) => PathBuf::from(stem),
            None => {
                warn!("{}: doesn't end in .bz2, skipping", name);
                return Ok(());
            }
        }
    } else {
        PathBuf::from(format!("{}.bz2", name))
    };
    if out_path.exists() && !args.force {
        warn!(
            "{}: output {} exists, use --force to overwrite",
            name,
            out_path.display()
        );
        return Ok(());
    }

    let output = io::BufWriter::new(File::create(&out_path)?);
    if decompress {
        decompress_stream(input, output, false)?;
    } else {
        compress_stream(input, output, args)?;
    }
    info!("{} -> {}", name, out_path.display());

    if !args.keep {
        fs::remove_file(path)?;
    }
    Ok(())
}
