//! PowerShell scripts submitted to the command host.
//!
//! Templates use `@@NAME@@` placeholders so PowerShell braces need no escaping.
//! Every substituted value goes through [`ps_quote`].

use crate::config::GallerySettings;

const PROVISION_TEMPLATE: &str = r#"
$VerbosePreference = 'Continue'
if (-not (Get-Module -ListAvailable -Name Microsoft.PowerShell.PSResourceGet)) {
    Write-Verbose 'PSResourceGet not found - attempting installation...'
    if (-not (Get-PackageProvider -Name NuGet -ListAvailable -ErrorAction SilentlyContinue)) {
        Install-PackageProvider -Name NuGet -Force -Scope @@SCOPE@@ -Verbose
    }
    Set-PSRepository -Name @@REPOSITORY@@ -InstallationPolicy Trusted -Verbose
    Install-Module -Name Microsoft.PowerShell.PSResourceGet -Scope @@SCOPE@@ -Force -Verbose
} else {
    Write-Verbose 'PSResourceGet module found'
}
Import-Module -Name Microsoft.PowerShell.PSResourceGet -Global -ErrorAction Stop
"#;

const LIST_UPDATES_TEMPLATE: &str = r#"
$VerbosePreference = 'Continue'
Write-Verbose 'Starting module check...'
$Umbrellas = @@UMBRELLAS@@
$Installed = try {
    @(Get-InstalledPSResource -ErrorAction Stop | Group-Object Name)
} catch [Microsoft.PowerShell.PSResourceGet.UtilClasses.ResourceNotFoundException] {
    Write-Verbose 'No installed modules found'
    return
}
Write-Verbose "Found $($Installed.Count) installed modules"
foreach ($Module in $Installed) {
    $Umbrella = $Umbrellas | Where-Object { $Module.Name -like "$_.*" -and $_ -in $Installed.Name } | Select-Object -First 1
    if ($Umbrella) {
        Write-Verbose "Skipping $($Module.Name), covered by $Umbrella"
        continue
    }
    Write-Verbose "Checking $($Module.Name)..."
    $Check = Find-PSResource -Name $Module.Name -Repository @@REPOSITORY@@ -ErrorAction SilentlyContinue | Select-Object -First 1
    if (-not $Check) {
        Write-Warning "$($Module.Name) was not found in @@REPOSITORY_TEXT@@"
        continue
    }
    $Current = $Module.Group | Sort-Object { [version]"$($_.Version)" } -Descending | Select-Object -First 1
    if ([version]"$($Check.Version)" -gt [version]"$($Current.Version)") {
        Write-Verbose "Update found for $($Module.Name): $($Current.Version) -> $($Check.Version)"
        [pscustomobject]@{
            Name           = [string]$Check.Name
            CurrentVersion = [string]$Current.Version
            NewVersion     = [string]$Check.Version
            PublishedDate  = $Check.PublishedDate
            ReleaseNotes   = $Check.ReleaseNotes
        }
    }
}
Write-Verbose 'Module check complete'
"#;

const LIST_INSTALLED_SCRIPT: &str = r#"
$VerbosePreference = 'Continue'
$Installed = try {
    @(Get-InstalledPSResource -ErrorAction Stop)
} catch [Microsoft.PowerShell.PSResourceGet.UtilClasses.ResourceNotFoundException] {
    Write-Verbose 'No installed modules found'
    return
}
Write-Verbose "Found $($Installed.Count) installed module versions"
foreach ($Module in $Installed) {
    [pscustomobject]@{
        Name          = [string]$Module.Name
        Version       = [string]$Module.Version
        Author        = $Module.Author
        InstalledDate = $Module.InstalledDate
        Location      = $Module.InstalledLocation
        ProjectUri    = if ($Module.ProjectUri) { [string]$Module.ProjectUri } else { $null }
    }
}
"#;

const UPDATE_TEMPLATE: &str = r#"
$VerbosePreference = 'Continue'
@@TRUST@@
$Modules = @@MODULES@@
foreach ($Module in $Modules) {
    Write-Verbose "Updating $Module..."
    Update-PSResource -Name $Module -Repository @@REPOSITORY@@ -Scope @@SCOPE@@ -Verbose
}
Write-Verbose 'Update run finished'
"#;

const TRUST_LINE: &str = "Set-PSResourceRepository -Name @@REPOSITORY@@ -Trusted";

/// Quotes `value` as a single-quoted PowerShell string literal.
///
/// PowerShell treats the typographic single quotes as quote characters too,
/// so each of them is doubled along with `'`.
pub fn ps_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if matches!(ch, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            quoted.push(ch);
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

/// Renders `values` as a PowerShell array literal of quoted strings.
pub fn ps_array<S: AsRef<str>>(values: &[S]) -> String {
    let items: Vec<String> = values.iter().map(|v| ps_quote(v.as_ref())).collect();
    format!("@({})", items.join(", "))
}

/// Ensures PSResourceGet is installed and imported into the session.
pub fn provision_script(gallery: &GallerySettings) -> String {
    PROVISION_TEMPLATE
        .replace("@@REPOSITORY@@", &ps_quote(&gallery.repository))
        .replace("@@SCOPE@@", &gallery.scope)
}

/// Emits one `PendingUpdate`-shaped object per module with a newer version.
pub fn list_updates_script(gallery: &GallerySettings) -> String {
    LIST_UPDATES_TEMPLATE
        .replace("@@UMBRELLAS@@", &ps_array(&gallery.umbrellas))
        .replace("@@REPOSITORY@@", &ps_quote(&gallery.repository))
        .replace("@@REPOSITORY_TEXT@@", &escape_in_double_quotes(&gallery.repository))
}

/// Emits one `InstalledModule`-shaped object per installed module version.
pub fn list_installed_script() -> String {
    LIST_INSTALLED_SCRIPT.to_string()
}

/// One batched script updating every named module in turn.
pub fn update_script<S: AsRef<str>>(gallery: &GallerySettings, modules: &[S]) -> String {
    let trust = if gallery.trust_repository {
        TRUST_LINE.to_string()
    } else {
        String::new()
    };
    UPDATE_TEMPLATE
        .replace("@@TRUST@@", &trust)
        .replace("@@MODULES@@", &ps_array(modules))
        .replace("@@REPOSITORY@@", &ps_quote(&gallery.repository))
        .replace("@@SCOPE@@", &gallery.scope)
}

fn escape_in_double_quotes(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '`' | '$' | '"' | '\u{201C}' | '\u{201D}' | '\u{201E}') {
            escaped.push('`');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_doubles_single_quotes() {
        assert_eq!(ps_quote("Az"), "'Az'");
        assert_eq!(ps_quote("O'Brien"), "'O''Brien'");
        assert_eq!(ps_quote("x\u{2019}y"), "'x\u{2019}\u{2019}y'");
        assert_eq!(ps_quote("'; Remove-Item C:\\ -Recurse; '"), "'''; Remove-Item C:\\ -Recurse; '''");
    }

    #[test]
    fn array_lists_every_value() {
        assert_eq!(ps_array(&["Az", "Pester"]), "@('Az', 'Pester')");
        assert_eq!(ps_array::<&str>(&[]), "@()");
    }

    #[test]
    fn update_script_batches_all_modules() {
        let gallery = GallerySettings::default();
        let script = update_script(&gallery, &["ModuleA", "ModuleB"]);
        assert!(script.contains("$Modules = @('ModuleA', 'ModuleB')"));
        assert_eq!(script.matches("Update-PSResource").count(), 1);
        assert!(script.contains("Set-PSResourceRepository -Name 'PSGallery' -Trusted"));
        assert!(script.contains("-Scope CurrentUser"));
        assert!(!script.contains("@@"));
    }

    #[test]
    fn update_script_skips_trust_when_disabled() {
        let gallery = GallerySettings {
            trust_repository: false,
            ..GallerySettings::default()
        };
        let script = update_script(&gallery, &["Pester"]);
        assert!(!script.contains("Set-PSResourceRepository"));
    }

    #[test]
    fn list_updates_script_embeds_umbrellas_and_repository() {
        let gallery = GallerySettings {
            repository: "Internal$Feed".into(),
            ..GallerySettings::default()
        };
        let script = list_updates_script(&gallery);
        assert!(script.contains("$Umbrellas = @('Az', 'Microsoft.Graph')"));
        assert!(script.contains("-Repository 'Internal$Feed'"));
        assert!(script.contains("not found in Internal`$Feed"));
        assert!(!script.contains("@@"));
    }

    #[test]
    fn provision_script_installs_into_configured_scope() {
        let gallery = GallerySettings {
            scope: "AllUsers".into(),
            ..GallerySettings::default()
        };
        let script = provision_script(&gallery);
        assert!(script.contains("Install-Module -Name Microsoft.PowerShell.PSResourceGet -Scope AllUsers"));
        assert!(script.contains("Import-Module -Name Microsoft.PowerShell.PSResourceGet -Global"));
        assert!(!script.contains("@@"));
    }
}
