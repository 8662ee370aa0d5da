//! Okapi BM25 over pre-tokenized documents

use std::collections::HashMap;

/// Term saturation
pub const K1: f64 = 1.5;
/// Length normalization
pub const B: f64 = 0.75;
/// Floor for negative idf, as a fraction of the average idf
pub const EPSILON: f64 = 0.25;

/// BM25 index built once per corpus
#[derive(Debug, Clone)]
pub struct Bm25Okapi {
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_lengths: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
    k1: f64,
    b: f64,
}

impl Bm25Okapi {
    /// Index `corpus` with the default parameters
    pub fn new(corpus: &[Vec<String>]) -> Self {
        Self::with_params(corpus, K1, B, EPSILON)
    }

    pub fn with_params(corpus: &[Vec<String>], k1: f64, b: f64, epsilon: f64) -> Self {
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lengths = Vec::with_capacity(corpus.len());
        let mut containing: HashMap<String, usize> = HashMap::new();

        for document in corpus {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in document {
                *freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for token in freqs.keys() {
                *containing.entry(token.clone()).or_insert(0) += 1;
            }
            doc_lengths.push(document.len());
            doc_freqs.push(freqs);
        }

        let total: usize = doc_lengths.iter().sum();
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total as f64 / corpus.len() as f64
        };

        let n = corpus.len() as f64;
        let mut idf = HashMap::with_capacity(containing.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (token, count) in containing {
            let count = count as f64;
            let value = (n - count + 0.5).ln() - (count + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(token.clone());
            }
            idf.insert(token, value);
        }

        if !idf.is_empty() {
            let floor = epsilon * idf_sum / idf.len() as f64;
            for token in negative {
                idf.insert(token, floor);
            }
        }

        Self {
            doc_freqs,
            doc_lengths,
            avgdl,
            idf,
            k1,
            b,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_freqs.is_empty()
    }

    /// Score of every document against `query`, in corpus order
    pub fn get_scores(&self, query: &[&str]) -> Vec<f64> {
        let mut scores = vec![0.0; self.doc_freqs.len()];
        if self.avgdl == 0.0 {
            return scores;
        }

        for token in query {
            let Some(idf) = self.idf.get(*token) else {
                continue;
            };
            for (i, freqs) in self.doc_freqs.iter().enumerate() {
                let f = freqs.get(*token).copied().unwrap_or(0) as f64;
                let norm = self.k1 * (1.0 - self.b + self.b * self.doc_lengths[i] as f64 / self.avgdl);
                scores[i] += idf * (f * (self.k1 + 1.0) / (f + norm));
            }
        }

        scores
    }

    /// Indices of the `n` best documents, best first. Equal scores put the
    /// later document first.
    pub fn top_n(&self, query: &[&str], n: usize) -> Vec<usize> {
        let scores = self.get_scores(query);
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.cmp(&a))
        });
        order.truncate(n);
        order
    }
}
