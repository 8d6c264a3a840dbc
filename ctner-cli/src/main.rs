//! Linha de comando do ctner: preparação de dados, corpus e inferência em lote

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ctner_core::aggregate::DEFAULT_BACKGROUND_LABEL;
use ctner_core::corpus::transform_lines;
use ctner_core::dataset::{DatasetBuilder, DatasetReport, Partition, SplitConfig};
use ctner_core::embedding::{WordVectors, DEFAULT_QUERY_WORDS};
use ctner_core::format::{inference_header, InferenceRow};
use ctner_core::{
    AggregatorConfig, InferencePipeline, LexiconPredictor, Predictor, SlotRetention, Transformer,
};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Desliga a máscara de números (`@NUMBER`)
    #[arg(long, global = true)]
    keep_numbers: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Anotações -> arquivos de treino e teste realinhados
    Prepare {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        train: PathBuf,
        #[arg(short = 'v', long)]
        test: PathBuf,
        #[arg(long, default_value_t = 0.1)]
        test_ratio: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Transforma um corpus, uma linha por vez, para treinar embeddings
    Transform {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Inferência em lote com um preditor de dicionário
    Ner {
        #[arg(short, long)]
        lexicon: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_BACKGROUND_LABEL)]
        background: String,
        /// Mantém todos os slots de cada rótulo, não só o primeiro
        #[arg(long)]
        all_slots: bool,
    },
    /// Vizinhos mais próximos num arquivo `.vec`
    Neighbors {
        #[arg(short, long)]
        vectors: PathBuf,
        /// Palavras consultadas; sem nenhuma, usa uma lista clínica padrão
        #[arg(short, long = "word")]
        words: Vec<String>,
        #[arg(long, default_value_t = WordVectors::DEFAULT_TOP)]
        top: usize,
        #[arg(long, default_value_t = WordVectors::DEFAULT_MIN_SCORE)]
        min_score: f32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let transformer = Transformer::new(ctner_core::TransformerConfig {
        mask_numbers: !cli.keep_numbers,
    });

    match cli.command {
        Command::Prepare {
            input,
            train,
            test,
            test_ratio,
            seed,
        } => {
            let config = SplitConfig { test_ratio, seed };
            let report = prepare_files(&input, &train, &test, transformer, config)?;
            println!("{report}");
        }
        Command::Transform { input, output } => {
            let corpus = open(&input)?;
            let mut out = create(&output)?;
            let count = transform_corpus(corpus, &mut out, &transformer)?;
            out.flush()?;
            info!(lines = count, output = %output.display(), "corpus transformed");
        }
        Command::Ner {
            lexicon,
            input,
            output,
            background,
            all_slots,
        } => {
            let predictor =
                LexiconPredictor::from_reader(open(&lexicon)?, &transformer, &background)
                    .with_context(|| format!("failed to load lexicon {}", lexicon.display()))?;
            info!(
                terms = predictor.term_count(),
                labels = predictor.labels().len(),
                "lexicon loaded"
            );
            let config = AggregatorConfig {
                background_label: background,
                retention: if all_slots {
                    SlotRetention::All
                } else {
                    SlotRetention::FirstPerLabel
                },
            };
            let pipeline = InferencePipeline::new(transformer, predictor, config);
            let rows = open(&input)?;
            let mut out = create(&output)?;
            let count = detect_rows(rows, &mut out, &pipeline)?;
            out.flush()?;
            info!(rows = count, output = %output.display(), "inference finished");
        }
        Command::Neighbors {
            vectors,
            words,
            top,
            min_score,
        } => {
            let vectors = WordVectors::parse(open(&vectors)?)
                .with_context(|| format!("failed to read vectors {}", vectors.display()))?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            print_neighbors(&mut out, &vectors, &words, top, min_score)?;
        }
    }
    Ok(())
}

/// Vizinhos de cada palavra consultada. Sem palavras, consulta
/// [`DEFAULT_QUERY_WORDS`].
fn print_neighbors<W: Write>(
    out: &mut W,
    vectors: &WordVectors,
    words: &[String],
    top: usize,
    min_score: f32,
) -> Result<()> {
    let words: Vec<&str> = if words.is_empty() {
        DEFAULT_QUERY_WORDS.to_vec()
    } else {
        words.iter().map(String::as_str).collect()
    };
    for word in words {
        let neighbors = vectors.nearest_neighbors(word, top, min_score);
        if neighbors.is_empty() {
            writeln!(out, "No nearest neighbors for '{word}'")?;
            continue;
        }
        writeln!(out, "{word}")?;
        for neighbor in neighbors {
            writeln!(out, "  {:<30} {:.4}", neighbor.word, neighbor.score)?;
        }
    }
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Abre as anotações antes de criar as saídas, para que um caminho de entrada
/// inválido não deixe arquivos vazios para trás.
fn prepare_files(
    input: &Path,
    train: &Path,
    test: &Path,
    transformer: Transformer,
    config: SplitConfig,
) -> Result<DatasetReport> {
    let annotations = open(input)?;
    let mut train_out = create(train)?;
    let mut test_out = create(test)?;
    let report = prepare(annotations, &mut train_out, &mut test_out, transformer, config)?;
    train_out.flush()?;
    test_out.flush()?;
    Ok(report)
}

/// Separa as anotações em treino e teste, com os spans realinhados.
fn prepare<R: BufRead, W: Write>(
    input: R,
    train: &mut W,
    test: &mut W,
    transformer: Transformer,
    config: SplitConfig,
) -> Result<DatasetReport> {
    let mut builder = DatasetBuilder::new(transformer, config);
    for (line_no, line) in input.lines().enumerate() {
        let line = line.context("failed to read annotations")?;
        let sample = builder
            .push_line(&line)
            .with_context(|| format!("annotation line {}", line_no + 1))?;
        match sample {
            Some((Partition::Train, sample)) => writeln!(train, "{}", sample.to_line())?,
            Some((Partition::Test, sample)) => writeln!(test, "{}", sample.to_line())?,
            None => {}
        }
    }
    Ok(builder.report())
}

fn transform_corpus<R: BufRead, W: Write>(
    input: R,
    out: &mut W,
    transformer: &Transformer,
) -> Result<usize> {
    let lines = input
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .context("failed to read corpus")?;
    let transformed = transform_lines(transformer, &lines);
    for line in &transformed {
        writeln!(out, "{line}")?;
    }
    Ok(transformed.len())
}

/// Anexa os slots detectados a cada linha. A primeira linha é o cabeçalho;
/// linhas sem exatamente três campos são puladas.
fn detect_rows<R: BufRead, W: Write, P: Predictor>(
    input: R,
    out: &mut W,
    pipeline: &InferencePipeline<P>,
) -> Result<usize> {
    let mut lines = input.lines();
    let Some(header) = lines.next() else {
        return Ok(0);
    };
    writeln!(out, "{}", inference_header(&header.context("failed to read header")?))?;

    let mut rows = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line.context("failed to read inference input")?;
        match InferenceRow::parse(&line) {
            Ok(row) => rows.push(row),
            Err(err) => warn!(line = line_no + 2, %err, "skipping inference row"),
        }
    }

    let output: Vec<String> = rows
        .par_iter()
        .map(|row| -> Result<String> {
            let detected = pipeline
                .detect(row.text())
                .with_context(|| format!("inference failed for {:?}", row.text()))?;
            Ok(row.to_line(&detected)?)
        })
        .collect::<Result<_>>()?;
    for line in &output {
        writeln!(out, "{line}")?;
    }
    Ok(output.len())
}
