// Geometry of the reduced block grid that every frame is rescaled into
// before element computation (see `reducer`).
pub const BLOCK_GRID: usize = 32;

// Stagger, in fine signatures, between one coarse signature opening and
// the next; also the modulus of `StreamContext::coarsecount`.
pub const COARSE_SIZE: usize = 45;

// Width, in fine signatures, of one coarse signature. Two coarse
// signatures are open at once in steady state, staggered by COARSE_SIZE,
// so every fine signature past the first window contributes to exactly
// two of them (§4.C3).
pub const COARSE_WINDOW: usize = 2 * COARSE_SIZE;

// Total number of ternary elements in a fine signature, and the number of
// bytes needed to pack them five-per-byte.
pub const NUM_ELEMENTS: usize = 380;
pub const FRAME_SIG_BYTES: usize = NUM_ELEMENTS / 5;

// Number of bag-of-words bit-vectors per coarse signature, the number of
// possible word values (3^5), and the packed size of one such bit-vector.
pub const NUM_WORDS: usize = 5;
pub const WORD_VALUES: usize = 243;
pub const WORD_BYTES: usize = 31; // ceil(243 / 8)

// Place values of the five ternary digits packed into one signature byte,
// most-significant digit first: byte = d0*81 + d1*27 + d2*9 + d3*3 + d4.
pub const TERNARY_PLACE: [u16; 5] = [81, 27, 9, 3, 1];

// Scaling factor used to keep block-sum accumulation exact in 64-bit
// arithmetic for all resolutions up to the overflow bound checked by
// `Reducer::needs_divide`. Equal to lcm(1..=33) rounded up to the product
// actually needed by 32-way block splits.
pub const BLOCK_LCM: i64 = 476_985_600;

// Fixed-point scale used once `needs_divide` trips and exact LCM scaling
// would overflow.
pub const DIVIDE_PRECISION: i64 = 65_536;

// Sorted positions, within the flattened 380-element sequence, of the 25
// elements that contribute bits to the five coarse-signature words.
pub const WORD_POSITIONS: [usize; 25] = [
  44, 57, 70, 100, 101, 102, 103, 111, 175, 210, 217, 219, 233, 237, 269, 270,
  273, 274, 275, 285, 295, 296, 334, 337, 354,
];

// Permutation from encounter order (i-th entry of WORD_POSITIONS) to
// word-slot*5 + digit-place within that word.
pub const WORD_SLOT_PERMUTATION: [usize; 25] = [
  5, 10, 11, 15, 20, 21, 12, 22, 6, 0, 1, 2, 7, 13, 14, 8, 9, 3, 23, 16, 17,
  24, 4, 18, 19,
];

// Default matching thresholds (§3, §4.C7, §4.C9 of the design).
pub const DEFAULT_TH_D: u32 = 9000;
pub const DEFAULT_TH_DC: u32 = 60000;
pub const DEFAULT_TH_XH: u32 = 116;
// The buffer-compare entry point hard-codes a looser per-frame threshold
// than live extraction; both values are preserved rather than unified.
pub const COMPARE_TH_XH: u32 = 150;
pub const DEFAULT_TH_DI: u32 = 0;
pub const DEFAULT_TH_IT: f64 = 0.5;

// Hough accumulator dimensions: 60 framerate-ratio buckets (1..=60,
// representing ratio/30) and 181 offset buckets (-90..=90).
pub const HOUGH_FRAMERATE_BINS: usize = 60;
pub const HOUGH_MAX_OFFSET: i32 = 90;
pub const HOUGH_OFFSET_BINS: usize = (2 * HOUGH_MAX_OFFSET + 1) as usize;

// Fraction of the maximum vote count a Hough cell must exceed to be
// promoted to a match candidate.
pub const HOUGH_CANDIDATE_RATIO: f64 = 0.7;

// Consecutive-bad-frame tolerance before the sequence evaluator rolls back.
pub const SEQUENCE_TOLERANCE: u32 = 2;
