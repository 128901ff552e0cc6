//! Row-oriented access shared by the owned and borrowed image buffers.

pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn stride(&self) -> usize;

    /// Interleaved samples per pixel.
    fn channels(&self) -> usize {
        1
    }

    /// Row `y` holding `width() * channels()` samples.
    fn row(&self, y: usize) -> &[Self::Pixel];

    fn is_contiguous(&self) -> bool {
        self.stride() == self.width() * self.channels()
    }
}

pub trait ImageViewMut: ImageView {
    fn row_mut(&mut self, y: usize) -> &mut [Self::Pixel];
}
