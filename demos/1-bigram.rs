// This example demonstrates fitting a bigram model on a handful of
// names and continuing a few seeds greedily.

// Set RUST_LOG=debug to follow batching and generation step by step.

use charnn::{ Corpus, BigramModel, GreedySampler };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

fn main() -> charnn::Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| "info".into()))
    .with(tracing_subscriber::fmt::layer())
    .init();

  // Lines get padded with spaces, so the space is part of the vocabulary
  let corpus = Corpus::new(&["anna", "hannah", "ada", "alan", "nathan"])?;

  // Count transitions over shuffled mini batches, reshuffled every epoch
  let mut model = BigramModel::new(corpus.vocabulary().len(), 0.1);
  let mut loader = corpus.loader(2, Some(0))?;
  for _ in 0..3 {
    for batch in loader.epoch()? {
      let batch = batch?;
      model.fit(&batch.inputs, &batch.targets)?;
    }
  }

  let sampler = GreedySampler::new(&model, corpus.vocabulary())?;
  for seed in ["a", "ha", "na"] {
    let text = sampler.sample(seed, 8)?;
    tracing::info!(seed, text = %text.trim_end(), "sampled");
  }

  // Peek at what the model expects after "h"
  let probs = sampler.distribution("h")?;
  for (c, p) in corpus.vocabulary().chars().iter().zip(probs.param_iter()) {
    println!("{:?} {:.3}", c, p);
  }

  Ok(())
}
