// Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use docent_embed::{
    DeterministicProvider, EmbedError, EmbeddingMode, EmbeddingProvider, EmbeddingResult,
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Bytes of a PDF with one line of Courier text per page.
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

/// A temporary knowledge-base directory.
pub struct KnowledgeBase {
    pub dir: TempDir,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a PDF with the given page texts and return its path.
    pub fn add_pdf(&self, name: &str, pages: &[&str]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, pdf_bytes(pages)).expect("write pdf");
        path
    }

    /// Write arbitrary bytes under `name` and return the path.
    pub fn add_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).expect("write file");
        path
    }
}

/// Deterministic provider that counts calls and can be made slow or failing.
pub struct CountingProvider {
    inner: DeterministicProvider,
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl CountingProvider {
    pub fn new(dimension: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: DeterministicProvider::new(dimension).expect("valid dimension"),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        })
    }

    pub fn slow(dimension: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: DeterministicProvider::new(dimension).expect("valid dimension"),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: Some(delay),
        })
    }

    /// Number of `embed_texts` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following call fail as an unreachable service would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    async fn embed_texts(&self, texts: &[String]) -> docent_embed::Result<EmbeddingResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbedError::Api {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        self.inner.embed_texts(texts).await
    }

    fn embedding_dimension(&self) -> Option<usize> {
        self.inner.embedding_dimension()
    }

    fn mode(&self) -> EmbeddingMode {
        EmbeddingMode::DeterministicFallback
    }

    fn provider_name(&self) -> &str {
        "counting"
    }
}
