//! One direction pair of record protection with its sequence numbers.

use crate::cipher::{create_cipher, NullCipher, RecordProtection};
use crate::crypto::Context;
use crate::negotiation::Negotiated;
use crate::types::{AlertDescription, ContentType, ProtocolVersion};
use crate::window::ReplayWindow;
use crate::Error;

/// Default plaintext fragment limit (RFC 5246 6.2.1).
pub const MAX_PLAINTEXT_FRAGMENT: usize = 1 << 14;

/// Ciphertext may exceed the plaintext limit by at most this (RFC 5246 6.2.3).
const MAX_CIPHERTEXT_EXPANSION: usize = 2048;

/// DTLS sequence numbers are 48 bits, the epoch takes the top 16.
const DTLS_SEQUENCE_BITS: u32 = 48;

/// Last TLS sequence number. One below the maximum so the counter can mark
/// exhaustion without wrapping.
const TLS_SEQUENCE_LIMIT: u64 = u64::MAX - 1;

/// The record protection in force, and where each direction is in its
/// sequence.
///
/// A renegotiation builds a new state; this one is never re-keyed.
#[derive(Debug)]
pub struct ConnectionState {
    protection: RecordProtection,
    read_seq: u64,
    write_seq: u64,
    /// Last usable sequence number.
    seq_limit: u64,
    /// DTLS epoch, mixed into the sequence numbers given to the cipher.
    epoch: Option<u16>,
    /// DTLS replay protection for the read epoch.
    replay: ReplayWindow,
    max_fragment: usize,
}

impl ConnectionState {
    pub fn new(protection: RecordProtection, max_plaintext_fragment: usize) -> Self {
        ConnectionState {
            protection,
            read_seq: 0,
            write_seq: 0,
            seq_limit: TLS_SEQUENCE_LIMIT,
            epoch: None,
            replay: ReplayWindow::new(),
            max_fragment: max_plaintext_fragment,
        }
    }

    /// Unprotected records, as before the first ChangeCipherSpec.
    pub fn null() -> Self {
        Self::new(RecordProtection::Null(NullCipher), MAX_PLAINTEXT_FRAGMENT)
    }

    /// Build the protection for a finished negotiation.
    ///
    /// The context takes over the negotiated parameters and must already hold
    /// the master secret.
    pub fn from_negotiated(ctx: &mut Context, negotiated: &Negotiated) -> Result<Self, Error> {
        ctx.apply(negotiated);
        let suite = negotiated.cipher_suite;
        let protection = create_cipher(ctx, suite.encryption_algorithm(), suite.mac_algorithm())?;

        let mut state = Self::new(protection, negotiated.max_plaintext_fragment());
        if negotiated.version.is_dtls() {
            // The first protected epoch
            state = state.with_epoch(1);
        }
        Ok(state)
    }

    /// Use DTLS record numbering: `epoch << 48 | sequence`.
    pub fn with_epoch(mut self, epoch: u16) -> Self {
        self.epoch = Some(epoch);
        self.seq_limit = (1 << DTLS_SEQUENCE_BITS) - 1;
        self
    }

    /// Wrap an already built protection, numbering records for `version`.
    pub fn for_version(
        protection: RecordProtection,
        version: ProtocolVersion,
        epoch: u16,
    ) -> Self {
        let state = Self::new(protection, MAX_PLAINTEXT_FRAGMENT);
        if version.is_dtls() {
            state.with_epoch(epoch)
        } else {
            state
        }
    }

    pub fn protection(&self) -> &RecordProtection {
        &self.protection
    }

    pub fn epoch(&self) -> Option<u16> {
        self.epoch
    }

    /// Next sequence number to read. For DTLS, one past the highest
    /// authenticated record.
    pub fn read_sequence(&self) -> u64 {
        self.read_seq
    }

    /// Next sequence number to write. For DTLS this is the sequence number
    /// the next [`ConnectionState::encode`] goes out with.
    pub fn write_sequence(&self) -> u64 {
        self.write_seq
    }

    pub fn max_plaintext_fragment(&self) -> usize {
        self.max_fragment
    }

    /// Largest plaintext that fits both the fragment limit and
    /// `ciphertext_limit`.
    pub fn plaintext_limit(&self, ciphertext_limit: usize) -> usize {
        self.protection
            .plaintext_limit(ciphertext_limit)
            .min(self.max_fragment)
    }

    /// Protect the next outgoing record.
    pub fn encode(&mut self, content_type: ContentType, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        if plaintext.len() > self.max_fragment {
            return Err(Error::InvalidArgument(format!(
                "Fragment of {} exceeds limit {}",
                plaintext.len(),
                self.max_fragment
            )));
        }

        let seq = next_sequence(&mut self.write_seq, self.seq_limit, AlertDescription::InternalError)?;
        let seq = self.record_number(seq);

        trace!("Encode {:?} record {} ({} bytes)", content_type, seq, plaintext.len());

        self.protection.encode_plaintext(seq, content_type, plaintext)
    }

    /// Authenticate and decrypt the next incoming TLS record.
    ///
    /// DTLS records carry their own epoch and sequence number and go
    /// through [`ConnectionState::decode_dtls`] instead.
    pub fn decode(&mut self, content_type: ContentType, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        if self.epoch.is_some() {
            return Err(Error::IllegalState(
                "DTLS records are decoded with their header epoch and sequence".into(),
            ));
        }

        let seq = next_sequence(
            &mut self.read_seq,
            self.seq_limit,
            AlertDescription::UnexpectedMessage,
        )?;

        trace!("Decode {:?} record {} ({} bytes)", content_type, seq, ciphertext.len());

        let plaintext = self.unprotect(seq, content_type, ciphertext)?;
        if plaintext.len() > self.max_fragment {
            return Err(Error::alert(
                AlertDescription::RecordOverflow,
                format!("Plaintext of {} bytes", plaintext.len()),
            ));
        }

        Ok(plaintext)
    }

    /// Authenticate and decrypt a DTLS record, given the epoch and sequence
    /// number from its header.
    ///
    /// Returns `Ok(None)` for a record that is silently dropped: another
    /// epoch, a replay, or an authenticated plaintext over the fragment
    /// limit. Records may arrive out of order or not at all.
    pub fn decode_dtls(
        &mut self,
        content_type: ContentType,
        epoch: u16,
        sequence_number: u64,
        ciphertext: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        let Some(read_epoch) = self.epoch else {
            return Err(Error::IllegalState(
                "TLS records have no epoch or explicit sequence".into(),
            ));
        };
        if sequence_number > self.seq_limit {
            return Err(Error::InvalidArgument(format!(
                "DTLS sequence number {} exceeds 48 bits",
                sequence_number
            )));
        }

        if epoch != read_epoch {
            debug!("Drop {:?} record from epoch {}, reading {}", content_type, epoch, read_epoch);
            return Ok(None);
        }
        if self.replay.should_discard(sequence_number) {
            debug!("Drop replayed {:?} record {}", content_type, sequence_number);
            return Ok(None);
        }

        let seq = self.record_number(sequence_number);
        trace!("Decode {:?} record {} ({} bytes)", content_type, seq, ciphertext.len());

        let plaintext = self.unprotect(seq, content_type, ciphertext)?;
        self.replay.mark_authenticated(sequence_number);
        self.read_seq = self.read_seq.max(sequence_number + 1);

        if plaintext.len() > self.max_fragment {
            debug!("Drop {:?} record of {} bytes", content_type, plaintext.len());
            return Ok(None);
        }

        Ok(Some(plaintext))
    }

    fn unprotect(&mut self, seq: u64, content_type: ContentType, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        if ciphertext.len() > self.max_fragment + MAX_CIPHERTEXT_EXPANSION {
            return Err(Error::alert(
                AlertDescription::RecordOverflow,
                format!("Ciphertext of {} bytes", ciphertext.len()),
            ));
        }
        self.protection.decode_ciphertext(seq, content_type, ciphertext)
    }

    fn record_number(&self, seq: u64) -> u64 {
        match self.epoch {
            Some(epoch) => ((epoch as u64) << DTLS_SEQUENCE_BITS) | seq,
            None => seq,
        }
    }
}

/// Take the current value and advance. Sequence numbers never wrap.
fn next_sequence(seq: &mut u64, limit: u64, alert: AlertDescription) -> Result<u64, Error> {
    let current = *seq;
    if current > limit {
        return Err(Error::alert(alert, "Sequence numbers cannot wrap"));
    }
    *seq = current + 1;
    Ok(current)
}
