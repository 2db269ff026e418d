//! Simple example of embedding generation and similarity.
//!
//! Uses the deterministic fallback unless `OPENAI_API_KEY` is set, in which
//! case the live endpoint is called.

use docent_embed::{EmbedConfig, EmbeddingMode, create_provider};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => EmbedConfig::live(key),
        _ => EmbedConfig::deterministic(256),
    };

    println!("docent-embed example");
    println!("   Mode: {}", config.mode);
    if config.mode == EmbeddingMode::Live {
        println!("   Model: {}", config.model_name);
        println!("   Endpoint: {}", config.embeddings_url());
    }

    let provider = create_provider(&config)?;

    let text = "Hello, this is a test sentence for embedding generation.";
    let embedding = provider.embed_text(text).await?;
    println!("\nSingle text: \"{text}\"");
    println!("   Dimension: {}", embedding.len());
    println!("   First 5 values: {:?}", &embedding[..5.min(embedding.len())]);

    let texts = vec![
        "Rust is a systems programming language.".to_string(),
        "PDF pages are split into overlapping chunks.".to_string(),
        "Rust is a systems programming language.".to_string(),
    ];
    let result = provider.embed_texts(&texts).await?;
    println!("\nGenerated {} embeddings of dimension {}", result.len(), result.dimension);

    for (i, text) in texts.iter().enumerate() {
        let score = cosine(&result.embeddings[0], &result.embeddings[i]);
        println!("   sim(text 1, text {}) = {score:.4}  \"{text}\"", i + 1);
    }

    Ok(())
}
