/// Sliding replay window for DTLS record sequence numbers (RFC 6347 4.1.2.6).
///
/// Keeps the highest authenticated sequence number and a 64-bit bitmap of
/// the ones just below it. Checking and recording are separate steps so that
/// only records that authenticate move the window.
///
/// One window covers one epoch.
#[derive(Debug, Default)]
pub(crate) struct ReplayWindow {
    max_seq: u64,
    window: u64,
}

const WINDOW_SIZE: u64 = 64;

impl ReplayWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `seqno` was already seen or is too old to tell.
    pub fn should_discard(&self, seqno: u64) -> bool {
        if self.window == 0 || seqno > self.max_seq {
            return false;
        }
        let offset = self.max_seq - seqno;
        offset >= WINDOW_SIZE || self.window & (1 << offset) != 0
    }

    /// Record a sequence number whose record authenticated.
    pub fn mark_authenticated(&mut self, seqno: u64) {
        if self.window == 0 {
            self.max_seq = seqno;
            self.window = 1;
        } else if seqno > self.max_seq {
            let delta = seqno - self.max_seq;
            self.window = if delta < WINDOW_SIZE {
                self.window << delta
            } else {
                0
            };
            self.window |= 1;
            self.max_seq = seqno;
        } else {
            let offset = self.max_seq - seqno;
            if offset < WINDOW_SIZE {
                self.window |= 1 << offset;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept(w: &mut ReplayWindow, seqno: u64) -> bool {
        if w.should_discard(seqno) {
            return false;
        }
        w.mark_authenticated(seqno);
        true
    }

    #[test]
    fn accepts_fresh_and_rejects_duplicate() {
        let mut w = ReplayWindow::new();
        assert!(accept(&mut w, 0));
        assert!(!accept(&mut w, 0));
        assert!(accept(&mut w, 1));
        assert!(accept(&mut w, 2));
        assert!(!accept(&mut w, 1));
    }

    #[test]
    fn accepts_out_of_order_within_window() {
        let mut w = ReplayWindow::new();
        assert!(accept(&mut w, 10));
        assert!(accept(&mut w, 8));
        assert!(!accept(&mut w, 8));
        assert!(accept(&mut w, 9));
    }

    #[test]
    fn rejects_too_old() {
        let mut w = ReplayWindow::new();
        assert!(accept(&mut w, 100));
        // offset 64
        assert!(!accept(&mut w, 36));
        // offset 63, once
        assert!(accept(&mut w, 37));
        assert!(!accept(&mut w, 37));
    }

    #[test]
    fn large_jump_forgets_old_bits() {
        let mut w = ReplayWindow::new();
        assert!(accept(&mut w, 1));
        assert!(accept(&mut w, 81));
        assert!(accept(&mut w, 80));
        // Offset 63 from 81, never seen
        assert!(accept(&mut w, 18));
        assert!(!accept(&mut w, 17));
    }

    #[test]
    fn unauthenticated_records_do_not_move_window() {
        let mut w = ReplayWindow::new();
        w.mark_authenticated(5);
        // Checked but never marked
        assert!(!w.should_discard(500));
        assert!(!w.should_discard(4));
        w.mark_authenticated(4);
        assert!(w.should_discard(4));
    }
}
