// ============================================================
// Layer 4 — Batchers
// ============================================================
// Implement Burn's Batcher trait to stack individual samples into
// tensors. Every batcher holds the device its tensors are created
// on, so the same type serves the autodiff training loader and the
// plain inference-backend validation loader.
//
//   ShapeBatcher       ImageSample  → images [B,1,H,W], labels [B]
//   SeriesBatcher      SeriesSample → inputs [B,T,1],   targets [B,F]
//   ClassWindowBatcher SeriesSample → inputs [B,1,T],   classes [B]
//   AudioTokenBatcher  SeriesSample → bins   [B,T],     targets [B,1]
//   TokenBatcher       TokenPair    → padded source / shifted target
//
// Samples within one run share their shapes, except translation
// pairs, which are padded with id 0 to the longest pair in the batch.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::quantizer::Quantizer;
use crate::domain::sample::{ImageSample, SeriesSample, TokenPair};
use crate::infra::tokenizer_store::PAD_ID;

// ─── Shapes ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ShapeBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ShapeBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> ShapeBatcher<B> {
    pub fn new(device: B::Device) -> Self { Self { device } }
}

impl<B: Backend> Batcher<ImageSample, ShapeBatch<B>> for ShapeBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ShapeBatch<B> {
        let batch_size    = items.len();
        let (h, w)        = (items[0].height, items[0].width);

        let pixels: Vec<f32> = items.iter().flat_map(|s| s.pixels.iter().copied()).collect();
        let labels: Vec<i64> = items.iter().map(|s| s.label.label() as i64).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 1, h, w]), &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]), &self.device,
        );
        ShapeBatch { images, labels }
    }
}

// ─── Series regression ───────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SeriesBatch<B: Backend> {
    /// [batch, time, 1]: one feature per step, LSTM layout
    pub inputs:  Tensor<B, 3>,
    /// [batch, future]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct SeriesBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SeriesBatcher<B> {
    pub fn new(device: B::Device) -> Self { Self { device } }
}

impl<B: Backend> Batcher<SeriesSample, SeriesBatch<B>> for SeriesBatcher<B> {
    fn batch(&self, items: Vec<SeriesSample>) -> SeriesBatch<B> {
        let batch_size = items.len();
        let steps      = items[0].input.len();
        let future     = items[0].target.len();

        let inputs: Vec<f32>  = items.iter().flat_map(|s| s.input.iter().copied()).collect();
        let targets: Vec<f32> = items.iter().flat_map(|s| s.target.iter().copied()).collect();

        SeriesBatch {
            inputs: Tensor::from_data(TensorData::new(inputs, [batch_size, steps, 1]), &self.device),
            targets: Tensor::from_data(TensorData::new(targets, [batch_size, future]), &self.device),
        }
    }
}

// ─── Next-sample classification ──────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ClassWindowBatch<B: Backend> {
    /// [batch, 1, time]: channels-first for conv1d
    pub inputs:  Tensor<B, 3>,
    /// [batch]: bin of the first target value
    pub classes: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ClassWindowBatcher<B: Backend> {
    device:    B::Device,
    quantizer: Quantizer,
}

impl<B: Backend> ClassWindowBatcher<B> {
    pub fn new(device: B::Device, quantizer: Quantizer) -> Self { Self { device, quantizer } }
}

impl<B: Backend> Batcher<SeriesSample, ClassWindowBatch<B>> for ClassWindowBatcher<B> {
    fn batch(&self, items: Vec<SeriesSample>) -> ClassWindowBatch<B> {
        let batch_size = items.len();
        let steps      = items[0].input.len();

        let inputs: Vec<f32>  = items.iter().flat_map(|s| s.input.iter().copied()).collect();
        let classes: Vec<i64> = items
            .iter()
            .map(|s| self.quantizer.encode(s.target[0]) as i64)
            .collect();

        ClassWindowBatch {
            inputs: Tensor::from_data(TensorData::new(inputs, [batch_size, 1, steps]), &self.device),
            classes: Tensor::from_data(TensorData::new(classes, [batch_size]), &self.device),
        }
    }
}

// ─── Audio transformer: quantised context → next value ───────────────────────
#[derive(Debug, Clone)]
pub struct AudioTokenBatch<B: Backend> {
    /// [batch, time] amplitude bins
    pub inputs:  Tensor<B, 2, Int>,
    /// [batch, 1]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct AudioTokenBatcher<B: Backend> {
    device:    B::Device,
    quantizer: Quantizer,
}

impl<B: Backend> AudioTokenBatcher<B> {
    pub fn new(device: B::Device, quantizer: Quantizer) -> Self { Self { device, quantizer } }
}

impl<B: Backend> Batcher<SeriesSample, AudioTokenBatch<B>> for AudioTokenBatcher<B> {
    fn batch(&self, items: Vec<SeriesSample>) -> AudioTokenBatch<B> {
        let batch_size = items.len();
        let steps      = items[0].input.len();

        let bins: Vec<i64> = items
            .iter()
            .flat_map(|s| s.input.iter().map(|&v| self.quantizer.encode(v) as i64))
            .collect();
        let targets: Vec<f32> = items.iter().map(|s| s.target[0]).collect();

        AudioTokenBatch {
            inputs: Tensor::from_data(TensorData::new(bins, [batch_size, steps]), &self.device),
            targets: Tensor::from_data(TensorData::new(targets, [batch_size, 1]), &self.device),
        }
    }
}

// ─── Translation: padded teacher forcing ─────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TokenBatch<B: Backend> {
    /// [batch, src_len]
    pub source:     Tensor<B, 2, Int>,
    /// [batch, src_len]: true where `source` is padding
    pub source_pad: Tensor<B, 2, Bool>,
    /// [batch, tgt_len - 1]: target without its last token
    pub target_in:  Tensor<B, 2, Int>,
    /// [batch, tgt_len - 1]: target without its first token
    pub target_out: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct TokenBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> TokenBatcher<B> {
    pub fn new(device: B::Device) -> Self { Self { device } }
}

/// Right-pad every row with PAD_ID to the longest row.
pub fn pad_rows(rows: &[&[u32]]) -> (Vec<i64>, usize) {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut flat = Vec::with_capacity(rows.len() * width);
    for row in rows {
        flat.extend(row.iter().map(|&id| id as i64));
        flat.extend(std::iter::repeat(PAD_ID as i64).take(width - row.len()));
    }
    (flat, width)
}

impl<B: Backend> Batcher<TokenPair, TokenBatch<B>> for TokenBatcher<B> {
    fn batch(&self, items: Vec<TokenPair>) -> TokenBatch<B> {
        let batch_size = items.len();

        let sources: Vec<&[u32]> = items.iter().map(|p| p.source.as_slice()).collect();
        let inputs: Vec<&[u32]>  = items.iter().map(|p| &p.target[..p.target.len() - 1]).collect();
        let outputs: Vec<&[u32]> = items.iter().map(|p| &p.target[1..]).collect();

        let (src, src_len) = pad_rows(&sources);
        let (tin, tgt_len) = pad_rows(&inputs);
        let (tout, _)      = pad_rows(&outputs);

        let source = Tensor::<B, 2, Int>::from_data(
            TensorData::new(src, [batch_size, src_len]), &self.device,
        );
        let source_pad = source.clone().equal_elem(PAD_ID as i64);

        TokenBatch {
            source,
            source_pad,
            target_in: Tensor::from_data(TensorData::new(tin, [batch_size, tgt_len]), &self.device),
            target_out: Tensor::from_data(TensorData::new(tout, [batch_size, tgt_len]), &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::ShapeKind;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_shape_batch_dims() {
        let sample = ImageSample {
            pixels: vec![0.5; 6 * 6],
            height: 6,
            width:  6,
            label:  ShapeKind::Square,
        };
        let batch = ShapeBatcher::<TestBackend>::new(Default::default())
            .batch(vec![sample.clone(), sample]);
        assert_eq!(batch.images.dims(), [2, 1, 6, 6]);
        assert_eq!(batch.labels.into_data().to_vec::<i64>().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_series_batch_dims() {
        let s = SeriesSample::new(vec![0.1, 0.2, 0.3], vec![0.4, 0.5]);
        let batch = SeriesBatcher::<TestBackend>::new(Default::default())
            .batch(vec![s.clone(), s.clone(), s]);
        assert_eq!(batch.inputs.dims(), [3, 3, 1]);
        assert_eq!(batch.targets.dims(), [3, 2]);
    }

    #[test]
    fn test_class_window_batch_quantises_first_target() {
        let q     = Quantizer::new(256).unwrap();
        let s     = SeriesSample::new(vec![0.0; 8], vec![1.0, -1.0]);
        let batch = ClassWindowBatcher::<TestBackend>::new(Default::default(), q).batch(vec![s]);
        assert_eq!(batch.inputs.dims(), [1, 1, 8]);
        assert_eq!(batch.classes.into_data().to_vec::<i64>().unwrap(), vec![255]);
    }

    #[test]
    fn test_audio_token_batch() {
        let q     = Quantizer::new(16).unwrap();
        let s     = SeriesSample::new(vec![-1.0, 0.0, 1.0], vec![0.25]);
        let batch = AudioTokenBatcher::<TestBackend>::new(Default::default(), q).batch(vec![s]);
        assert_eq!(batch.inputs.into_data().to_vec::<i64>().unwrap(), vec![0, 8, 15]);
        assert_eq!(batch.targets.dims(), [1, 1]);
    }

    #[test]
    fn test_token_batch_pads_and_shifts() {
        let a = TokenPair { source: vec![2, 10, 3], target: vec![2, 20, 21, 3] };
        let b = TokenPair { source: vec![2, 11, 12, 13, 3], target: vec![2, 22, 3] };
        let batch = TokenBatcher::<TestBackend>::new(Default::default()).batch(vec![a, b]);

        assert_eq!(batch.source.dims(), [2, 5]);
        assert_eq!(batch.target_in.dims(), [2, 3]);
        assert_eq!(
            batch.target_in.into_data().to_vec::<i64>().unwrap(),
            vec![2, 20, 21, 2, 22, 0]
        );
        assert_eq!(
            batch.target_out.into_data().to_vec::<i64>().unwrap(),
            vec![20, 21, 3, 22, 3, 0]
        );
        assert_eq!(
            batch.source_pad.into_data().to_vec::<bool>().unwrap(),
            vec![false, false, false, true, true, false, false, false, false, false]
        );
    }

    #[test]
    fn test_pad_rows() {
        let (flat, width) = pad_rows(&[&[1, 2][..], &[3][..]]);
        assert_eq!(width, 2);
        assert_eq!(flat, vec![1, 2, 3, 0]);
    }
}
