pub mod erase;
pub mod init;
pub mod read;
pub mod status;
pub mod switch;
pub mod write;

use std::io::Write;

use rprom::config::SECTORS_PER_SLOT;

/// Sixteen-step progress bar over the sectors of one slot.
pub(crate) fn progress_bar(label: &'static str) -> impl FnMut(usize) {
    move |sector| {
        if sector == 0 {
            print!("{label}: [                ]\r{label}: [");
        }
        if sector & 7 == 7 {
            print!("#");
        }
        let _ = std::io::stdout().flush();
        if sector + 1 == SECTORS_PER_SLOT {
            println!("]");
        }
    }
}
