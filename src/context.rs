/// Where tensor kernels execute.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
  #[default]
  Cpu,
  /// Split matrix products across the rayon thread pool.
  #[cfg(feature = "rayon")]
  Threaded,
}


/// Execution context passed explicitly into every forward computation.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
  pub device: Device,
}

impl Context {
  pub fn new(device: Device) -> Self {
    Self { device }
  }

  pub fn cpu() -> Self {
    Self::new(Device::Cpu)
  }
}
