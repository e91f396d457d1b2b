//! Beam search decoding over a next-token log-probability function.
//!
//! Model-agnostic: the caller supplies `step(prefix) -> log_probs`, where
//! `prefix` starts with the decoder start token. A beam width of 1 is greedy
//! decoding.

use crate::types::Result;
use std::cmp::Ordering;

/// Beam search settings.
#[derive(Debug, Clone, Copy)]
pub struct BeamSearch {
    /// Number of beams kept per step
    pub num_beams: usize,
    /// Maximum generated tokens (excluding start and end tokens)
    pub max_new_tokens: usize,
    /// End-of-sequence token
    pub eos_token_id: u32,
    /// Exponent applied to the length when normalizing scores
    pub length_penalty: f32,
}

/// Finished sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    /// Generated tokens, without start and end tokens
    pub tokens: Vec<u32>,
    /// Length-normalized log-probability
    pub score: f32,
}

impl BeamSearch {
    /// Create beam search settings with length penalty 1.0.
    pub fn new(num_beams: usize, max_new_tokens: usize, eos_token_id: u32) -> Self {
        Self {
            num_beams: num_beams.max(1),
            max_new_tokens,
            eos_token_id,
            length_penalty: 1.0,
        }
    }

    /// Set the length penalty (0.0 compares raw log-probability sums).
    pub fn with_length_penalty(mut self, length_penalty: f32) -> Self {
        self.length_penalty = length_penalty;
        self
    }

    fn normalize(&self, sum_logprob: f32, len: usize) -> f32 {
        sum_logprob / (len.max(1) as f32).powf(self.length_penalty)
    }

    /// Run the search.
    ///
    /// Stops once `num_beams` hypotheses have finished or the token budget
    /// is spent; unfinished beams then compete with finished ones.
    ///
    /// # Errors
    ///
    /// Propagates errors from `step`
    pub fn run<F>(&self, start_token: u32, mut step: F) -> Result<Hypothesis>
    where
        F: FnMut(&[u32]) -> Result<Vec<f32>>,
    {
        let mut beams: Vec<(Vec<u32>, f32)> = vec![(vec![start_token], 0.0)];
        let mut finished: Vec<Hypothesis> = Vec::new();

        for _ in 0..self.max_new_tokens {
            let mut candidates: Vec<(usize, u32, f32)> = Vec::new();
            for (beam_idx, (prefix, score)) in beams.iter().enumerate() {
                let log_probs = step(prefix)?;
                for (token, lp) in top_k(&log_probs, 2 * self.num_beams) {
                    candidates.push((beam_idx, token, score + lp));
                }
            }
            candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));

            let mut next: Vec<(Vec<u32>, f32)> = Vec::with_capacity(self.num_beams);
            for (rank, (beam_idx, token, score)) in candidates.into_iter().enumerate() {
                let prefix = &beams[beam_idx].0;
                if token == self.eos_token_id {
                    // an end token only counts when it ranks among the live beams
                    if rank < self.num_beams {
                        finished.push(Hypothesis {
                            tokens: prefix[1..].to_vec(),
                            score: self.normalize(score, prefix.len() - 1),
                        });
                    }
                } else {
                    let mut extended = prefix.clone();
                    extended.push(token);
                    next.push((extended, score));
                }
                if next.len() == self.num_beams {
                    break;
                }
            }

            beams = next;
            if finished.len() >= self.num_beams || beams.is_empty() {
                break;
            }
        }

        if finished.len() < self.num_beams {
            finished.extend(beams.into_iter().map(|(prefix, score)| Hypothesis {
                score: self.normalize(score, prefix.len() - 1),
                tokens: prefix[1..].to_vec(),
            }));
        }

        Ok(finished
            .into_iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal))
            .unwrap_or(Hypothesis {
                tokens: Vec::new(),
                score: 0.0,
            }))
    }
}

/// Indices and values of the `k` largest entries, highest first.
///
/// Ties keep ascending index order.
fn top_k(values: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut indexed: Vec<(u32, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u32, *v))
        .collect();
    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    indexed.truncate(k);
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: u32 = 0;
    const EOS: u32 = 1;
    const A: u32 = 2;
    const B: u32 = 3;

    /// Toy model where greedy decoding misses the most likely sequence.
    ///
    /// `A` is the likelier first token but everything after it is uncertain;
    /// `B` is followed by the end token with high probability.
    fn toy_model(prefix: &[u32]) -> Result<Vec<f32>> {
        let probs: [f32; 4] = match prefix {
            [START] => [1e-9, 0.1, 0.5, 0.4],
            [START, A] => [1e-9, 0.3, 0.35, 0.35],
            [START, B] => [1e-9, 0.9, 0.05, 0.05],
            _ => [1e-9, 1.0, 1e-9, 1e-9],
        };
        Ok(probs.iter().map(|p| p.ln()).collect())
    }

    #[test]
    fn test_greedy_takes_locally_best_tokens() {
        let best = BeamSearch::new(1, 10, EOS)
            .with_length_penalty(0.0)
            .run(START, toy_model)
            .unwrap();
        assert_eq!(best.tokens, vec![A, A]);
    }

    #[test]
    fn test_beam_finds_more_likely_sequence() {
        let best = BeamSearch::new(2, 10, EOS)
            .with_length_penalty(0.0)
            .run(START, toy_model)
            .unwrap();
        assert_eq!(best.tokens, vec![B]);
        assert!((best.score - (0.4f32.ln() + 0.9f32.ln())).abs() < 1e-4);
    }

    #[test]
    fn test_token_budget_stops_unfinished_beams() {
        // never emits the end token
        let best = BeamSearch::new(2, 3, EOS)
            .run(START, |_| Ok(vec![f32::NEG_INFINITY, f32::NEG_INFINITY, 0.0, -1.0]))
            .unwrap();
        assert_eq!(best.tokens, vec![A, A, A]);
    }

    #[test]
    fn test_immediate_end_token_yields_empty_sequence() {
        let best = BeamSearch::new(4, 10, EOS)
            .run(START, |_| Ok(vec![-10.0, 0.0, -10.0, -10.0]))
            .unwrap();
        assert!(best.tokens.is_empty());
    }

    #[test]
    fn test_step_errors_propagate() {
        let result = BeamSearch::new(2, 5, EOS).run(START, |_| {
            Err(crate::types::Text2SqlError::inference("local", "tensor error"))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_top_k_orders_and_breaks_ties_by_index() {
        let top = top_k(&[0.1, 0.5, 0.5, 0.2], 3);
        assert_eq!(top.iter().map(|t| t.0).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
