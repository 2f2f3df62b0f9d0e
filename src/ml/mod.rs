//! Learning primitives: text normalization, TF-IDF, label coding and the
//! random forest classifier.

mod artifacts;
mod forest;
mod label;
mod split;
mod text;
mod tfidf;
mod tree;

pub use artifacts::{build_features, TrainedArtifacts};
pub use forest::{argmax, RandomForest, DEFAULT_N_TREES, DEFAULT_SEED};
pub use label::LabelCodec;
pub use split::{
    stratified_split, ClassMetrics, SplitIndices, TrainingReport, DEFAULT_TEST_FRACTION,
};
pub use text::{is_stop_word, lemmatize, TextNormalizer};
pub use tfidf::{TfIdfVectorizer, DEFAULT_MAX_FEATURES};
pub use tree::{DecisionTree, TreeNode, TreeParams};
