use indicatif::{ProgressBar as Bar, ProgressStyle};

const TEMPLATE: &str = "{pos}/{len:.238} {bar:.162/238} {wide_msg}";
const PROGRESS_CHARS: &str = "━ ━";

/// Report progress to the CLI.
///
/// The bar is drawn on stderr, so results on stdout stay machine-readable.
#[derive(Clone, Debug)]
pub(crate) struct Progress {
    bar: Option<Bar>,
}

impl Progress {
    pub(crate) fn new(len: usize, hide_bar: bool) -> Self {
        let bar = (!hide_bar).then(|| {
            let style = ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars(PROGRESS_CHARS);
            let bar = Bar::new(len as u64).with_style(style);
            bar.set_message("Fetching");
            bar
        });

        Progress { bar }
    }

    /// Mark one more URL as done
    pub(crate) fn update(&self) {
        self.with_bar(|bar| bar.inc(1));
    }

    pub(crate) fn finish(&self) {
        self.with_bar(Bar::finish_and_clear);
    }

    fn with_bar<F>(&self, action: F)
    where
        F: FnOnce(&Bar),
    {
        if let Some(bar) = &self.bar {
            action(bar);
        }
    }

    #[cfg(test)]
    fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(Bar::position)
    }
}
