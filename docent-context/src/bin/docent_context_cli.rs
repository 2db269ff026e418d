use clap::{Parser, ValueEnum};
use docent_context::{Page, TextChunk, TextSplitter};
use std::fs;
use std::io::{self, Read};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Recursive,
    FixedWindow,
}

/// A CLI tool to chunk text files into JSON output using docent-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Source path recorded on every chunk.
    #[arg(short, long, default_value = "stdin")]
    source: String,

    /// Page number recorded on every chunk.
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Maximum length for each text chunk, in characters.
    #[arg(short = 'c', long, default_value_t = 1000)]
    chunk_size: usize,

    /// Characters of overlap between consecutive chunks.
    #[arg(short = 'o', long, default_value_t = 200)]
    chunk_overlap: usize,

    /// Splitting mode.
    #[arg(short, long, value_enum, default_value_t = Mode::Recursive)]
    mode: Mode,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let splitter = match args.mode {
        Mode::Recursive => TextSplitter::recursive(args.chunk_size, args.chunk_overlap),
        Mode::FixedWindow => TextSplitter::fixed_window(args.chunk_size, args.chunk_overlap),
    }
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let page = Page::new(args.source, args.page, file_content);
    let chunks: Vec<TextChunk> = splitter.get_chunks(&page);

    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{}", json_output);

    Ok(())
}
