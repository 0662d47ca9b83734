// We define separate Error types within the public and internal crate and
// just have the public crate wrap the internal crate. The internal crate
// (being no_std and allocation-free) sticks to `&'static str` errors.
//
// Errors are grouped into 2 broad families that callers may care about:
// - configuration errors: problems with the arguments used to set up the
//   engine (or a frame that doesn't match that setup)
// - state corruption errors: an injected checkpoint that doesn't match the
//   engine it is fed into

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

/// The underlying internal error type
#[non_exhaustive]
#[derive(Clone, Debug)]
enum ErrorKind {
    /// An error that occurs when an integer lies outside of the acceptable
    /// range of values
    IntegerRange(IntegerRangeError),
    /// An error that occurs when the number of buffers per level is odd
    OddBufferCount(OddBufferCountError),
    /// An error that occurs when a correlator is built without a label map
    MissingLabels(MissingLabelsError),
    /// An error that occurs when a label map doesn't define any ROI
    EmptyRoiSet(EmptyRoiSetError),
    /// An error that occurs when a frame's shape doesn't match the label map
    FrameShape(FrameShapeError),
    /// An error that occurs when a value-vector has the wrong length
    Length(LengthError),
    /// An error that occurs when an injected internal state doesn't match the
    /// configuration of the engine
    StateCorruption(StateCorruptionError),
    /// An error that occurs within `multitau_nostd_internal`
    InternalLegacyAdHoc(InternalLegacyAdHocError),
}

// define constructor methods for Error
impl Error {
    /// produce an error indicating that an integer lies outside the acceptable
    /// range of values
    pub(crate) fn integer_range(
        description: &'static str,
        actual: i64,
        min_val: i64,
        max_val: i64,
    ) -> Self {
        Error {
            kind: ErrorKind::IntegerRange(IntegerRangeError {
                description,
                actual,
                min_val,
                max_val,
            }),
        }
    }

    /// produce an error indicating that `num_bufs` is odd
    pub(crate) fn odd_buffer_count(num_bufs: usize) -> Self {
        Error {
            kind: ErrorKind::OddBufferCount(OddBufferCountError { num_bufs }),
        }
    }

    /// produce an error indicating that no label map was provided
    pub(crate) fn missing_labels() -> Self {
        Error {
            kind: ErrorKind::MissingLabels(MissingLabelsError),
        }
    }

    /// produce an error indicating that a label map holds no nonzero label
    pub(crate) fn empty_roi_set(shape: [usize; 2]) -> Self {
        Error {
            kind: ErrorKind::EmptyRoiSet(EmptyRoiSetError { shape }),
        }
    }

    /// produce an error indicating that a frame has the wrong shape
    pub(crate) fn frame_shape(expected: [usize; 2], actual: &[usize]) -> Self {
        Error {
            kind: ErrorKind::FrameShape(FrameShapeError {
                expected,
                actual: actual.to_vec(),
            }),
        }
    }

    /// produce an error indicating that a vector has the wrong length
    pub(crate) fn length(description: &'static str, expected: usize, actual: usize) -> Self {
        Error {
            kind: ErrorKind::Length(LengthError {
                description,
                expected,
                actual,
            }),
        }
    }

    /// produce an error indicating that an internal state can't be used to
    /// resume a calculation
    pub(crate) fn state_corruption(what: String) -> Self {
        Error {
            kind: ErrorKind::StateCorruption(StateCorruptionError { what }),
        }
    }

    /// wraps a legacy internal error string
    pub(crate) fn internal_legacy_adhoc(message: &'static str) -> Self {
        Error {
            kind: ErrorKind::InternalLegacyAdHoc(InternalLegacyAdHocError(message)),
        }
    }

    /// Indicates whether the error stems from the engine's configuration or
    /// from a frame that doesn't match that configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::IntegerRange(_)
                | ErrorKind::OddBufferCount(_)
                | ErrorKind::MissingLabels(_)
                | ErrorKind::EmptyRoiSet(_)
                | ErrorKind::FrameShape(_)
        )
    }

    /// Indicates whether the error stems from an injected internal state
    pub fn is_state_corruption(&self) -> bool {
        matches!(self.kind, ErrorKind::StateCorruption(_))
    }
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for ErrorKind {}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match *self {
            ErrorKind::IntegerRange(ref err) => err.fmt(f),
            ErrorKind::OddBufferCount(ref err) => err.fmt(f),
            ErrorKind::MissingLabels(ref err) => err.fmt(f),
            ErrorKind::EmptyRoiSet(ref err) => err.fmt(f),
            ErrorKind::FrameShape(ref err) => err.fmt(f),
            ErrorKind::Length(ref err) => err.fmt(f),
            ErrorKind::StateCorruption(ref err) => err.fmt(f),
            ErrorKind::InternalLegacyAdHoc(ref msg) => msg.fmt(f),
        }
    }
}

/// An error that occurs when an integer lies outside of the acceptable
/// range of values
#[derive(Clone, Debug)]
struct IntegerRangeError {
    description: &'static str,
    actual: i64,
    min_val: i64,
    max_val: i64,
}

impl std::error::Error for IntegerRangeError {}

impl core::fmt::Display for IntegerRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has a value of {}. The value should be no less than {} and \
             not exceed {}",
            self.description, self.actual, self.min_val, self.max_val
        )
    }
}

/// An error that occurs when the number of buffers per level is odd
#[derive(Clone, Debug)]
struct OddBufferCountError {
    num_bufs: usize,
}

impl std::error::Error for OddBufferCountError {}

impl core::fmt::Display for OddBufferCountError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "num_bufs must be even, but it is {}", self.num_bufs)
    }
}

/// An error that occurs when a correlator is built without a label map
#[derive(Clone, Debug)]
struct MissingLabelsError;

impl std::error::Error for MissingLabelsError {}

impl core::fmt::Display for MissingLabelsError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "a label map was not specified")
    }
}

/// An error that occurs when a label map doesn't hold any nonzero label
#[derive(Clone, Debug)]
struct EmptyRoiSetError {
    shape: [usize; 2],
}

impl std::error::Error for EmptyRoiSetError {}

impl core::fmt::Display for EmptyRoiSetError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let [nrows, ncols] = self.shape;
        write!(
            f,
            "the {nrows}x{ncols} label map doesn't hold any nonzero labels"
        )
    }
}

/// An error that occurs when a frame's shape doesn't match the label map
#[derive(Clone, Debug)]
struct FrameShapeError {
    expected: [usize; 2],
    actual: Vec<usize>,
}

impl std::error::Error for FrameShapeError {}

impl core::fmt::Display for FrameShapeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "frames have a shape of {:?}, which doesn't match the label map's \
             shape of {:?}",
            self.actual, self.expected
        )
    }
}

/// An error that occurs when a vector has the wrong length
#[derive(Clone, Debug)]
struct LengthError {
    description: &'static str,
    expected: usize,
    actual: usize,
}

impl std::error::Error for LengthError {}

impl core::fmt::Display for LengthError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} has {} elements. It should have {}",
            self.description, self.actual, self.expected
        )
    }
}

/// An error that occurs when an injected internal state doesn't match the
/// configuration of the engine that it's fed into
#[derive(Clone, Debug)]
struct StateCorruptionError {
    what: String,
}

impl std::error::Error for StateCorruptionError {}

impl core::fmt::Display for StateCorruptionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "the internal state can't be resumed: {}", self.what)
    }
}

/// wraps the string errors from `multitau_nostd_internal`
#[derive(Clone)]
struct InternalLegacyAdHocError(&'static str);

impl std::error::Error for InternalLegacyAdHocError {}

impl core::fmt::Display for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Debug for InternalLegacyAdHocError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        core::fmt::Debug::fmt(&self.0, f)
    }
}
