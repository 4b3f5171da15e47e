//! Stage 2: grammar validation and tape construction.
//!
//! A stack-less state machine walks the structural index stream produced by
//! stage 1. Instead of recursing into containers it records, per depth, the
//! tape position of the open cell and the state to resume after the scope
//! closes; `ScopeEnd` pops both. This is the plain-switch rendition of the
//! computed-goto dispatch the design calls for.

use crate::error::{Error, Result};
use crate::number::{parse_number, Number, STRUCTURAL_OR_WHITESPACE_OR_NULL};
use crate::strings::parse_string;
use crate::tape::{encode, TAPE_PAYLOAD_MASK};

/// Where to resume when the scope opened at this depth closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetState {
    ObjectContinue,
    ArrayContinue,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ObjectBegin,
    ObjectKey,
    ObjectContinue,
    ArrayBegin,
    ArrayContinue,
    Finish,
}

fn resume_state(ret: RetState) -> State {
    match ret {
        RetState::ObjectContinue => State::ObjectContinue,
        RetState::ArrayContinue => State::ArrayContinue,
        RetState::Finish => State::Finish,
    }
}

pub(crate) fn is_valid_true_atom(buf: &[u8], idx: usize) -> bool {
    buf.len() >= idx + 5
        && &buf[idx..idx + 4] == b"true"
        && STRUCTURAL_OR_WHITESPACE_OR_NULL[buf[idx + 4] as usize]
}

pub(crate) fn is_valid_false_atom(buf: &[u8], idx: usize) -> bool {
    buf.len() >= idx + 6
        && &buf[idx..idx + 5] == b"false"
        && STRUCTURAL_OR_WHITESPACE_OR_NULL[buf[idx + 5] as usize]
}

pub(crate) fn is_valid_null_atom(buf: &[u8], idx: usize) -> bool {
    buf.len() >= idx + 5
        && &buf[idx..idx + 4] == b"null"
        && STRUCTURAL_OR_WHITESPACE_OR_NULL[buf[idx + 4] as usize]
}

/// Everything stage 2 reads and writes, borrowed from the parser context.
pub(crate) struct TapeBuilder<'a> {
    /// Padded input.
    buf: &'a [u8],
    /// Logical input length.
    len: usize,
    /// Structural index stream, sentinel and guard included.
    structurals: &'a [u32],
    /// Entry count including the sentinel.
    n_structurals: usize,
    tape: &'a mut Vec<u64>,
    strings: &'a mut Vec<u8>,
    /// Tape position of the open cell, per depth.
    containing_scope: &'a mut Vec<u32>,
    /// Resume state, per depth.
    ret_stack: &'a mut Vec<RetState>,
    /// Maximum container nesting.
    max_depth: usize,

    i: usize,
    idx: usize,
    c: u8,
    depth: usize,
}

impl<'a> TapeBuilder<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        buf: &'a [u8],
        len: usize,
        structurals: &'a [u32],
        n_structurals: usize,
        tape: &'a mut Vec<u64>,
        strings: &'a mut Vec<u8>,
        containing_scope: &'a mut Vec<u32>,
        ret_stack: &'a mut Vec<RetState>,
        max_depth: usize,
    ) -> Self {
        TapeBuilder {
            buf,
            len,
            structurals,
            n_structurals,
            tape,
            strings,
            containing_scope,
            ret_stack,
            max_depth,
            i: 0,
            idx: 0,
            c: 0,
            depth: 0,
        }
    }

    #[inline]
    fn advance(&mut self) -> u8 {
        self.idx = self.structurals[self.i] as usize;
        self.i += 1;
        self.c = self.buf[self.idx];
        self.c
    }

    #[inline]
    fn current_loc(&self) -> usize {
        self.tape.len()
    }

    #[inline]
    fn write_tape(&mut self, tag: u8, payload: u64) {
        self.tape.push(encode(tag, payload));
    }

    /// Or the payload into a previously written cell.
    #[inline]
    fn annotate(&mut self, at: usize, payload: u64) {
        self.tape[at] |= payload & TAPE_PAYLOAD_MASK;
    }

    fn write_number(&mut self, number: Number) {
        match number {
            Number::I64(v) => {
                self.write_tape(b'l', 0);
                self.tape.push(v as u64);
            }
            Number::U64(v) => {
                self.write_tape(b'u', 0);
                self.tape.push(v);
            }
            Number::F64(v) => {
                self.write_tape(b'd', 0);
                self.tape.push(v.to_bits());
            }
        }
    }

    fn parse_string_value(&mut self) -> Result<()> {
        let s = parse_string(self.buf, self.idx, self.strings)?;
        self.write_tape(b'"', s.payload as u64);
        Ok(())
    }

    fn parse_atom_at(&mut self, buf: &[u8], idx: usize) -> Result<()> {
        match self.c {
            b't' if is_valid_true_atom(buf, idx) => self.write_tape(b't', 0),
            b't' => return Err(Error::TrueAtomError),
            b'f' if is_valid_false_atom(buf, idx) => self.write_tape(b'f', 0),
            b'f' => return Err(Error::FalseAtomError),
            b'n' if is_valid_null_atom(buf, idx) => self.write_tape(b'n', 0),
            b'n' => return Err(Error::NullAtomError),
            _ => return Err(Error::UnexpectedError),
        }
        Ok(())
    }

    fn parse_number_at(&mut self, buf: &[u8], idx: usize) -> Result<()> {
        let number = parse_number(buf, idx)?;
        self.write_number(number);
        Ok(())
    }

    /// Opens a container scope, recording the resume state for its close.
    fn start_scope(&mut self, tag: u8, continue_state: RetState) -> Result<()> {
        if self.depth > self.max_depth {
            return Err(Error::DepthError);
        }
        self.containing_scope[self.depth] = self.current_loc() as u32;
        self.write_tape(tag, 0);
        self.ret_stack[self.depth] = continue_state;
        self.depth += 1;
        Ok(())
    }

    /// Closes the innermost scope: cross-links open and close cells and
    /// yields the recorded resume state.
    fn end_scope(&mut self) -> State {
        self.depth -= 1;
        let open = self.containing_scope[self.depth] as usize;
        let close = self.current_loc();
        self.write_tape(self.c, open as u64);
        self.annotate(open, close as u64);
        resume_state(self.ret_stack[self.depth])
    }

    /// Dispatches one non-root value token and returns the follow state.
    fn parse_value(&mut self, continue_state: RetState) -> Result<State> {
        match self.c {
            b'"' => {
                self.parse_string_value()?;
                Ok(resume_state(continue_state))
            }
            b't' | b'f' | b'n' => {
                let (buf, idx) = (self.buf, self.idx);
                self.parse_atom_at(buf, idx)?;
                Ok(resume_state(continue_state))
            }
            b'0'..=b'9' | b'-' => {
                let (buf, idx) = (self.buf, self.idx);
                self.parse_number_at(buf, idx)?;
                Ok(resume_state(continue_state))
            }
            b'{' => {
                self.start_scope(b'{', continue_state)?;
                Ok(State::ObjectBegin)
            }
            b'[' => {
                self.start_scope(b'[', continue_state)?;
                Ok(State::ArrayBegin)
            }
            _ => Err(Error::TapeError),
        }
    }

    /// A scalar at document root has no trailing structural to bound its
    /// token, so it parses from a space-terminated copy of the input.
    fn with_space_terminated_copy<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self, &[u8], usize) -> Result<()>,
    {
        let mut copy = vec![0x20u8; self.len + crate::padded::PADDING];
        copy[..self.len].copy_from_slice(&self.buf[..self.len]);
        let idx = self.idx;
        f(self, &copy, idx)
    }

    /// Runs the machine to completion.
    pub(crate) fn run(mut self) -> Result<()> {
        self.tape.clear();
        self.strings.clear();

        // Root scope. Cell 0 is annotated with the final cell's position
        // when the document closes.
        self.containing_scope[0] = 0;
        self.write_tape(b'r', 0);
        self.ret_stack[0] = RetState::Finish;
        self.depth = 1;

        self.advance();
        let mut state = match self.c {
            b'{' => {
                self.start_scope(b'{', RetState::Finish)?;
                State::ObjectBegin
            }
            b'[' => {
                self.start_scope(b'[', RetState::Finish)?;
                State::ArrayBegin
            }
            b'"' => {
                self.parse_string_value()?;
                State::Finish
            }
            b't' | b'f' | b'n' => {
                self.with_space_terminated_copy(|s, copy, idx| s.parse_atom_at(copy, idx))?;
                State::Finish
            }
            b'0'..=b'9' | b'-' => {
                self.with_space_terminated_copy(|s, copy, idx| s.parse_number_at(copy, idx))?;
                State::Finish
            }
            _ => return Err(Error::TapeError),
        };

        loop {
            state = match state {
                State::ObjectBegin => {
                    self.advance();
                    match self.c {
                        b'"' => {
                            self.parse_string_value()?;
                            State::ObjectKey
                        }
                        b'}' => self.end_scope(),
                        _ => return Err(Error::TapeError),
                    }
                }
                State::ObjectKey => {
                    if self.advance() != b':' {
                        return Err(Error::TapeError);
                    }
                    self.advance();
                    self.parse_value(RetState::ObjectContinue)?
                }
                State::ObjectContinue => match self.advance() {
                    b',' => {
                        if self.advance() != b'"' {
                            return Err(Error::TapeError);
                        }
                        self.parse_string_value()?;
                        State::ObjectKey
                    }
                    b'}' => self.end_scope(),
                    _ => return Err(Error::TapeError),
                },
                State::ArrayBegin => {
                    self.advance();
                    if self.c == b']' {
                        self.end_scope()
                    } else {
                        self.parse_value(RetState::ArrayContinue)?
                    }
                }
                State::ArrayContinue => match self.advance() {
                    b',' => {
                        self.advance();
                        self.parse_value(RetState::ArrayContinue)?
                    }
                    b']' => self.end_scope(),
                    _ => return Err(Error::TapeError),
                },
                State::Finish => {
                    // The cursor must rest exactly on the sentinel.
                    if self.i + 1 != self.n_structurals {
                        return Err(Error::TapeError);
                    }
                    self.depth -= 1;
                    if self.depth != 0 {
                        return Err(Error::TapeError);
                    }
                    let open = self.containing_scope[0] as usize;
                    let close = self.current_loc();
                    self.annotate(open, close as u64);
                    self.write_tape(b'r', 0);
                    return Ok(());
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    // Stage 2 is exercised end to end through the parser; see the crate
    // test tree. The atom validators get direct coverage here because their
    // terminator handling is easy to get subtly wrong.
    use super::{is_valid_false_atom, is_valid_null_atom, is_valid_true_atom};

    #[test]
    fn atoms_require_exact_spelling_and_a_terminator() {
        assert!(is_valid_true_atom(b"true,xxxx", 0));
        assert!(is_valid_true_atom(b"true\0xxxx", 0));
        assert!(!is_valid_true_atom(b"truexxxxx", 0));
        assert!(!is_valid_true_atom(b"trux,xxxx", 0));
        assert!(is_valid_false_atom(b"false]xxx", 0));
        assert!(!is_valid_false_atom(b"falsyxxxx", 0));
        assert!(is_valid_null_atom(b"null}xxxx", 0));
        assert!(!is_valid_null_atom(b"nul,xxxxx", 0));
    }
}
