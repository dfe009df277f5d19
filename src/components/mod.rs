pub mod backends;
pub mod copy;
pub mod handle;
pub mod levels;
pub mod pyramid;
pub mod resample;
pub mod sample;
pub mod warp;
pub mod window;

pub use handle::{RasterEdit, RasterHandle, RasterMeta};
pub use resample::Resampling;
pub use sample::{Sample, SampleType};
pub use window::Window;
