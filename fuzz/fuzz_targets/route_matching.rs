#![no_main]

use ferrous_kernel::{RouteOptions, Router};
use http::Method;
use libfuzzer_sys::fuzz_target;

// Arbitrary request paths against a fixed route table must never panic.
fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    let router = Router::new();
    let _ = router.get("/", "Home", RouteOptions::named("home"));
    let _ = router.get("/users/{id}", "Users@show", RouteOptions::named("users.show"));
    let _ = router.post("/users/{id}/posts/{post}", "Posts@store", RouteOptions::new());
    let _ = router.any("/files/{*rest}", "Files", RouteOptions::new());
    let _ = router.get("/error/404", "Errors@missing", RouteOptions::new());

    for method in [Method::GET, Method::HEAD, Method::POST, Method::DELETE] {
        let _ = router.dispatch(&method, path);
    }
    let _ = router.has_path(path);

    if let Ok(status) = path.parse::<u16>() {
        let _ = router.find_error_route(status);
    }
});
