use pretty_assertions::assert_eq;
use sqlfold::{Discovery, Workspace};
use std::fs;
use std::path::Path;

const INIT: &str = r#"-- Initial schema
create extension if not exists "uuid-ossp";

create table public.profiles (
  id uuid primary key,
  username text unique
);

alter table public.profiles enable row level security;

create policy "Public profiles are viewable" on public.profiles
  for select using (true);

create function public.handle_new_user()
returns trigger as $$
begin
  insert into public.profiles (id) values (new.id);
  return new;
end;
$$ language plpgsql security definer;

-- trigger the function every time a user is created
create trigger on_auth_user_created
  after insert on auth.users
  for each row execute procedure public.handle_new_user();
"#;

const UPDATE: &str = r#"create table public.profiles (
  id uuid primary key,
  username text unique,
  avatar_url text
);

grant select on public.profiles to anon;

select pg_notify('done', '');
"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn load(dir: &Path) -> Workspace {
    let files = Discovery::default().discover(&[dir.to_path_buf()]);
    let mut ws = Workspace::new();
    ws.set_threads(2);
    let failures = ws.parse_paths(&files, None).unwrap();
    assert!(failures.is_empty());
    ws
}

#[test]
fn consolidates_migration_directory() {
    let dir = tempfile::tempdir().unwrap();
    // written out of order on purpose; discovery sorts by path
    write(dir.path(), "20240201000000_update.sql", UPDATE);
    write(dir.path(), "20240101000000_init.sql", INIT);
    write(dir.path(), "notes.md", "not sql");

    let ws = load(dir.path());
    let init = dir.path().join("20240101000000_init.sql").display().to_string();
    let update = dir.path().join("20240201000000_update.sql").display().to_string();
    let names: Vec<&str> = ws.files().iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec![init.as_str(), update.as_str()]);

    assert_eq!(ws.files()[0].unparsed, "");
    assert_eq!(ws.unparsed(), "select pg_notify('done', '');");
    assert_eq!(ws.statements().len(), 8);

    let expected = r#"-- ============================================================
-- Consolidated migration
-- Generated by sqlfold
-- ============================================================

-- Summary:
--   extension: 1
--   table: 1
--   function: 1
--   trigger: 1
--   policy: 1
--   alterRLSPolicy: 1
--   grant: 1
-- Total: 7 statements

-- ============================================================
-- EXTENSION (1)
-- ============================================================

-- From: {init}
-- Object: uuid-ossp
create extension if not exists "uuid-ossp";

-- ============================================================
-- TABLE (1)
-- ============================================================

-- From: {update}
-- Object: public.profiles
create table public.profiles (
  id uuid primary key,
  username text unique,
  avatar_url text
);

-- ============================================================
-- FUNCTION (1)
-- ============================================================

-- From: {init}
-- Object: public.handle_new_user
create function public.handle_new_user()
returns trigger as $$
begin
  insert into public.profiles (id) values (new.id);
  return new;
end;
$$ language plpgsql security definer;

-- ============================================================
-- TRIGGER (1)
-- ============================================================

-- From: {init}
-- Object: on_auth_user_created
create trigger on_auth_user_created
  after insert on auth.users
  for each row execute procedure public.handle_new_user();

-- ============================================================
-- POLICY (1)
-- ============================================================

-- From: {init}
-- Object: Public profiles are viewable on public.profiles
create policy "Public profiles are viewable" on public.profiles
  for select using (true);

-- ============================================================
-- ALTERRLSPOLICY (1)
-- ============================================================

-- From: {init}
-- Object: public.profiles
alter table public.profiles enable row level security;

-- ============================================================
-- GRANT (1)
-- ============================================================

-- From: {update}
-- Object: public.profiles
grant select on public.profiles to anon;

"#;
    let expected = expected.replace("{init}", &init).replace("{update}", &update);
    assert_eq!(ws.generate(), expected);
}

#[test]
fn reparse_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "20240101000000_init.sql", INIT);
    write(dir.path(), "20240201000000_update.sql", UPDATE);

    assert_eq!(load(dir.path()).generate(), load(dir.path()).generate());
}

#[test]
fn dependencies_of_profiles() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "20240101000000_init.sql", INIT);
    write(dir.path(), "20240201000000_update.sql", UPDATE);

    let ws = load(dir.path());
    let mut found: Vec<String> = ws
        .dependencies("profiles")
        .into_iter()
        .map(|s| format!("{}:{}", s.kind, s.name))
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            "grant:public.profiles",
            "policy:Public profiles are viewable on public.profiles",
        ]
    );
}

#[test]
fn unreadable_file_does_not_stop_batch() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "20240101000000_init.sql", INIT);

    let mut ws = Workspace::new();
    let failures = ws
        .parse_paths(&[dir.path().join("missing.sql"), dir.path().join("20240101000000_init.sql")], None)
        .unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(ws.files().len(), 1);
}
