//! Generates the `vulkan.hpp` C++ bindings from the Vulkan XML registry. In order to use, first
//! create a [`Registry`] from the contents of a `vk.xml` file, check it with
//! [`Registry::check_correctness()`], and then render the header with [`Registry::gen_hpp()`].
//! [`generate()`] does all three.
//!
//! ```no_run
//! let xml = std::fs::read("vk.xml").unwrap();
//! let header = vkhpp_generator::generate(&xml).unwrap();
//! std::fs::write("vulkan.hpp", header).unwrap();
//! ```

#[macro_use]
mod error;
pub mod text;
pub mod registry;
pub mod generator;

pub use error::{Error, Result};
pub use registry::Registry;

/// Reads, checks and renders a registry document in one go.
pub fn generate(vk_xml: &[u8]) -> Result<String> {
    let registry = Registry::new(vk_xml)?;
    log::info!(
        "read {} types, {} commands and {} extensions",
        registry.types.len(),
        registry.commands.len(),
        registry.extensions.len()
    );
    registry.check_correctness()?;
    registry.gen_hpp()
}
