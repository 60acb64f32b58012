// ============================================================
// Layer 5 — Positional Encoding
// ============================================================
// Attention is permutation-invariant, so both transformers add a
// fixed sinusoid to their embeddings:
//
//   angle(pos, i) = pos / 10000^(2⌊i/2⌋ / d_model)
//   PE[pos, i]    = sin(angle)  for even i
//                   cos(angle)  for odd i

use burn::prelude::*;

/// Row-major `[length, d_model]` table.
pub fn sinusoid_table(length: usize, d_model: usize) -> Vec<f32> {
    let mut table = Vec::with_capacity(length * d_model);
    for pos in 0..length {
        for i in 0..d_model {
            let rate  = 1.0 / 10000f64.powf((2 * (i / 2)) as f64 / d_model as f64);
            let angle = pos as f64 * rate;
            let value = if i % 2 == 0 { angle.sin() } else { angle.cos() };
            table.push(value as f32);
        }
    }
    table
}

/// `[length, d_model]`
pub fn positional_encoding<B: Backend>(length: usize, d_model: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(sinusoid_table(length, d_model), [length, d_model]), device)
}

/// Scale embeddings by √d_model and add the positional encoding.
/// `x` is `[batch, seq, d_model]`.
pub fn add_position<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let [batch, seq, d_model] = x.dims();
    let pe = positional_encoding::<B>(seq, d_model, &x.device())
        .unsqueeze::<3>()
        .expand([batch, seq, d_model]);
    x * (d_model as f64).sqrt() + pe
}
