use codeplay::{BatchRequest, RunResult};

use super::{fixture_source, scratch_is_empty, test_runner, toolchain_available};

fn request(language: &str, fixture: &str, inputs: &[&str]) -> BatchRequest {
    BatchRequest {
        language: language.to_owned(),
        code: fixture_source(fixture),
        inputs: inputs.iter().map(|s| (*s).to_owned()).collect(),
    }
}

#[tokio::test]
async fn test_python_hello() {
    let (runner, _events) = test_runner("py-hello");
    if !toolchain_available(&runner, "python") {
        return;
    }

    let result = runner
        .run_code_with_input(&request("python", "hello.py", &[]))
        .await;

    assert_eq!(result, RunResult::success("hi"));
    assert!(scratch_is_empty(&runner));
}

#[tokio::test]
async fn test_python_scripted_input() {
    let (runner, _events) = test_runner("py-input");
    if !toolchain_available(&runner, "python") {
        return;
    }

    let result = runner
        .run_code_with_input(&request("python", "echo_lines.py", &["one", "two"]))
        .await;

    assert_eq!(result, RunResult::success("ONE\nTWO"));
}

#[tokio::test]
async fn test_c_compile_and_run() {
    let (runner, _events) = test_runner("c-hello");
    if !toolchain_available(&runner, "c") {
        return;
    }

    let result = runner
        .run_code_with_input(&request("c", "hello.c", &["World"]))
        .await;

    assert_eq!(result, RunResult::success("Hello, World!"));
    assert!(scratch_is_empty(&runner));
}

#[tokio::test]
async fn test_c_compile_error() {
    let (runner, _events) = test_runner("c-error");
    if !toolchain_available(&runner, "c") {
        return;
    }

    let result = runner
        .run_code_with_input(&request("c", "compile_error.c", &[]))
        .await;

    assert!(!result.success);
    assert!(result.output.contains("undefined_symbol"), "{}", result.output);
    // no binary or source left behind
    assert!(scratch_is_empty(&runner));
}

#[tokio::test]
async fn test_java_without_public_class() {
    let (runner, _events) = test_runner("java-nopublic");

    // fails before any compiler is needed
    let result = runner
        .run_code_with_input(&request("java", "NoPublic.java", &[]))
        .await;

    assert_eq!(result, RunResult::failure("No public class found"));
    assert!(scratch_is_empty(&runner));
}

#[tokio::test]
async fn test_java_public_class() {
    let (runner, _events) = test_runner("java-greeter");
    if !toolchain_available(&runner, "java") {
        return;
    }

    let result = runner
        .run_code_with_input(&request("java", "Greeter.java", &["Duke"]))
        .await;

    assert_eq!(result, RunResult::success("Hello, Duke"));
    assert!(scratch_is_empty(&runner));
}

#[tokio::test]
async fn test_unsupported_language() {
    let (runner, _events) = test_runner("unsupported");

    let result = runner
        .run_code_with_input(&BatchRequest {
            language: "cobol".to_owned(),
            code: String::new(),
            inputs: Vec::new(),
        })
        .await;

    assert_eq!(
        result,
        RunResult::failure(
            "Unsupported language: cobol. Supported languages: c, cpp, go, java, javascript, php, python"
        )
    );
}
