pub mod bilibili;
pub mod xiaohongshu;

pub use bilibili::BilibiliPipeline;
pub use xiaohongshu::XiaohongshuPipeline;
