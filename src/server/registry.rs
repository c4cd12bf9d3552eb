use mio::Token;

/// Token of the listening socket.
pub const LISTENER: Token = Token(usize::MAX);
/// Token of the shutdown waker.
pub const WAKER: Token = Token(usize::MAX - 1);

const INDEX_BITS: u32 = 24;
const INDEX_MASK: usize = (1 << INDEX_BITS) - 1;
/// Generations wrap below the value that could reach the reserved tokens.
const GENERATION_LIMIT: usize = usize::MAX >> INDEX_BITS;

/// Most slots a registry can address.
pub const MAX_SLOTS: usize = 1 << INDEX_BITS;

#[derive(Debug)]
struct Slot<T> {
    generation: usize,
    value: Option<T>,
}

/// Fixed-capacity slot table keyed by generation-checked tokens.
///
/// A token is `generation << 24 | index`. Removing an entry bumps the slot's
/// generation, so a token held past `remove` no longer resolves even after
/// the slot is reused.
#[derive(Debug)]
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
    capacity: usize,
}

impl<T> Registry<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_SLOTS);
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` and returns its token, or hands it back when full.
    pub fn insert(&mut self, value: T) -> Result<Token, T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                self.slots.len() - 1
            }
            None => return Err(value),
        };

        let slot = &mut self.slots[index];
        slot.value = Some(value);
        self.len += 1;
        Ok(encode(slot.generation, index))
    }

    pub fn get(&self, token: Token) -> Option<&T> {
        let (generation, index) = decode(token);
        self.slots
            .get(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut T> {
        let (generation, index) = decode(token);
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Takes the entry out and retires its token.
    pub fn remove(&mut self, token: Token) -> Option<T> {
        let (generation, index) = decode(token);
        let slot = self.slots.get_mut(index)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;

        slot.generation = (slot.generation + 1) % GENERATION_LIMIT;
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    /// Tokens of every live entry.
    pub fn tokens(&self) -> Vec<Token> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(index, slot)| encode(slot.generation, index))
            .collect()
    }
}

fn encode(generation: usize, index: usize) -> Token {
    Token((generation << INDEX_BITS) | index)
}

fn decode(token: Token) -> (usize, usize) {
    (token.0 >> INDEX_BITS, token.0 & INDEX_MASK)
}
