use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.table = true;
    ext.strikethrough = true;
    ext.autolink = false;
    ext.tagfilter = false;

    let render = &mut options.render;
    // Templates are trusted and may carry raw `<img>` tags with sizing.
    render.r#unsafe = true;
    render.sourcepos = false;
}
