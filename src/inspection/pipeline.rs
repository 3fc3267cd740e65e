use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Observer stage. Sees every chunk exactly as it was read; the return value
/// is nothing, so it can only produce side effects.
pub type Matcher = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Transform stage. Its output replaces the chunk and may differ in length.
pub type Replacer = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// The two optional stages applied to every chunk, in a fixed order:
/// observe first, then transform.
#[derive(Clone, Default)]
pub struct Pipeline {
    matcher: Option<Matcher>,
    replacer: Option<Replacer>,
}

impl Pipeline {
    pub fn new(matcher: Option<Matcher>, replacer: Option<Replacer>) -> Self {
        Self { matcher, replacer }
    }

    pub fn is_passthrough(&self) -> bool {
        self.matcher.is_none() && self.replacer.is_none()
    }

    /// Runs both stages over `chunk` and returns the bytes to forward.
    ///
    /// Without a transform the original slice is returned untouched.
    pub fn apply<'a>(&self, chunk: &'a [u8]) -> Cow<'a, [u8]> {
        if let Some(matcher) = &self.matcher {
            matcher(chunk);
        }
        match &self.replacer {
            Some(replacer) => Cow::Owned(replacer(chunk)),
            None => Cow::Borrowed(chunk),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("matcher", &self.matcher.is_some())
            .field("replacer", &self.replacer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn empty_pipeline_is_identity() {
        let pipeline = Pipeline::default();
        assert!(pipeline.is_passthrough());

        let data = [0u8, 159, 146, 150, 255];
        let out = pipeline.apply(&data);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &data);
    }

    #[test]
    fn observer_sees_original_bytes_and_transform_output_wins() {
        let seen: Arc<Mutex<Vec<Vec<u8>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let matcher: Matcher = Arc::new(move |b: &[u8]| seen2.lock().unwrap().push(b.to_vec()));
        let replacer: Replacer = Arc::new(|b: &[u8]| b.to_ascii_uppercase());

        let pipeline = Pipeline::new(Some(matcher), Some(replacer));
        let out = pipeline.apply(b"hello");

        assert_eq!(&*out, b"HELLO");
        assert_eq!(seen.lock().unwrap().as_slice(), &[b"hello".to_vec()]);
    }

    #[test]
    fn transform_may_change_length() {
        let replacer: Replacer = Arc::new(|b: &[u8]| {
            let mut v = b.to_vec();
            v.extend_from_slice(b"\r\n");
            v
        });
        let pipeline = Pipeline::new(None, Some(replacer));
        assert_eq!(pipeline.apply(b"ping").len(), 6);
    }
}
