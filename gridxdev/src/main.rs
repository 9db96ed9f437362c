mod application;
mod presentation;

use gridx_core::error::Result;

fn main() -> Result<()> {
    application::run()
}
