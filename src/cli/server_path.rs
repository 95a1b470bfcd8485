use std::path::PathBuf;

/// The server binary is expected to live next to the cli one.
pub fn to_server_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("focuslog-server");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_server_path;

    #[test]
    #[cfg(unix)]
    fn test_server_next_to_cli() {
        assert_eq!(
            to_server_path(PathBuf::from("/usr/local/bin/focuslog")),
            PathBuf::from("/usr/local/bin/focuslog-server")
        );
    }
}
