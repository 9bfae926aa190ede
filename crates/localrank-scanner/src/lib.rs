pub mod error;
pub mod probe;
pub mod sampler;
pub mod scanner;
pub mod visualize;

pub use error::ScanError;
pub use probe::{rank_of, RankProbe};
pub use sampler::generate_points;
pub use scanner::{next_delay, GridScanner, ScanSettings};
pub use visualize::{
    classify, keyword_overlay, label, marker_icon_data_url, marker_svg, normalize_rank, render,
    Marker, MarkerSet, RankBucket,
};
