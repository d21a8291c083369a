// This example demonstrates running an untrained character RNN,
// saving it to a file and generating text with the loaded copy.

// Initialization is seeded, so every run produces the same text.

use charnn::{ Corpus, CharRnn, RnnConfig, Checkpoint, SequenceModel, GreedySampler, Context };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

fn main() -> charnn::Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| "info".into()))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let filename = std::env::temp_dir().join("char_rnn.model");

  let corpus = Corpus::new(&["hello world", "hold the door", "howl"])?;
  let config = RnnConfig { hidden_size: 16, seed: Some(7) };
  let model = CharRnn::new(corpus.vocabulary().len(), &config);
  println!("{} parameters", model.num_parameters());

  // Run a whole batch through the network
  let ctx = Context::default();
  let batch = corpus.encode_batch(&[0, 1, 2])?;
  let forward = model.forward(&ctx, &batch.inputs, None)?;
  println!("scores {:?}, hidden {:?}", forward.output.dims(), forward.hidden.map(|h| h.dims().to_vec() ));

  // Save to disc and load it back
  model.save(&filename)?;
  let loaded = CharRnn::load(&filename)?;
  assert_eq!(model, loaded);

  let sampler = GreedySampler::new(&loaded, corpus.vocabulary())?.with_context(ctx);
  println!("{:?}", sampler.sample("ho", 16)?);

  Ok(())
}
